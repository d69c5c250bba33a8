use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use signal_hook::{
    consts::signal::{SIGINT, SIGTERM},
    flag,
};

/// A flag raised by SIGINT or SIGTERM, polled between units of work so that a
/// run can stop at a point where disk state is still consistent. A second
/// signal falls through to the default handler and kills the process.
#[derive(Clone, Debug)]
pub struct Terminator {
    stop: Arc<AtomicBool>,
}

impl Terminator {
    pub fn install() -> std::io::Result<Self> {
        let stop = Arc::new(AtomicBool::new(false));

        for signal in [SIGINT, SIGTERM] {
            flag::register_conditional_default(signal, Arc::clone(&stop))?;
            flag::register(signal, Arc::clone(&stop))?;
        }

        Ok(Self { stop })
    }

    pub fn should_stop(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }
}
