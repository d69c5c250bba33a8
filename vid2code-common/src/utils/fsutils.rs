use std::{cmp::Ordering, fs, io, path::Path};

/// Orders strings the way a human reads frame names: runs of digits compare by
/// their numeric value, so "frame2" sorts before "frame10". Digit runs sort
/// before anything else, and equal values fall back to byte order so the
/// ordering stays total.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut a = a.as_bytes();
    let mut b = b.as_bytes();

    loop {
        match (a.first(), b.first()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(&ca), Some(&cb)) => match (ca.is_ascii_digit(), cb.is_ascii_digit()) {
                (true, false) => return Ordering::Less,
                (false, true) => return Ordering::Greater,
                (false, false) => {
                    if ca != cb {
                        return ca.cmp(&cb);
                    }
                    a = &a[1..];
                    b = &b[1..];
                }
                (true, true) => {
                    let (num_a, rest_a) = split_digits(a);
                    let (num_b, rest_b) = split_digits(b);
                    match compare_digit_runs(num_a, num_b) {
                        Ordering::Equal => {
                            a = rest_a;
                            b = rest_b;
                        }
                        unequal => return unequal,
                    }
                }
            },
        }
    }
}

fn split_digits(s: &[u8]) -> (&[u8], &[u8]) {
    let end = s
        .iter()
        .position(|c| !c.is_ascii_digit())
        .unwrap_or(s.len());
    s.split_at(end)
}

fn compare_digit_runs(a: &[u8], b: &[u8]) -> Ordering {
    let trim = |s: &[u8]| -> usize { s.iter().take_while(|&&c| c == b'0').count() };
    let sig_a = &a[trim(a)..];
    let sig_b = &b[trim(b)..];

    // same length after dropping leading zeros means byte order is numeric
    // order, and runs like "002" vs "2" stay distinguishable
    sig_a
        .len()
        .cmp(&sig_b.len())
        .then_with(|| sig_a.cmp(sig_b))
        .then_with(|| a.len().cmp(&b.len()))
}

/// Clears the directory at path, or creates it
pub fn clear_dir(dir: impl AsRef<Path>) -> io::Result<()> {
    let dir = dir.as_ref();
    match fs::symlink_metadata(dir) {
        Ok(meta) if meta.is_dir() => {
            fs::remove_dir_all(dir)?;
            fs::create_dir(dir)
        }
        Ok(_) => Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "dir is not a dir",
        )),
        Err(e) if e.kind() == io::ErrorKind::NotFound => fs::create_dir_all(dir),
        Err(e) => Err(e),
    }
}

/// Try to read the file, return None if it doesn't exist
pub fn read_optional_file(path: impl AsRef<Path>) -> io::Result<Option<String>> {
    match fs::read_to_string(path) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
        Ok(s) => Ok(Some(s)),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn sorted(mut names: Vec<&str>) -> Vec<&str> {
        names.sort_by(|a, b| natural_cmp(a, b));
        names
    }

    #[test]
    fn numbers_compare_by_value() {
        assert_eq!(Ordering::Less, natural_cmp("frame2", "frame10"));
        assert_eq!(Ordering::Less, natural_cmp("frame9.png", "frame10.png"));
        assert_eq!(Ordering::Equal, natural_cmp("frame7", "frame7"));
    }

    #[test]
    fn frame_names_sort_in_capture_order() {
        assert_eq!(
            vec!["frame1.png", "frame2.png", "frame10.png", "frame20.png"],
            sorted(vec!["frame10.png", "frame2.png", "frame20.png", "frame1.png"])
        );
    }

    #[test]
    fn leading_zeros_do_not_collide() {
        assert_eq!(Ordering::Less, natural_cmp("frame2", "frame002"));
        assert_eq!(Ordering::Less, natural_cmp("frame002", "frame3"));
    }

    #[test]
    fn text_still_sorts_lexically() {
        assert_eq!(Ordering::Less, natural_cmp("apple", "banana"));
        assert_eq!(Ordering::Less, natural_cmp("1intro", "aintro"));
    }

    #[test]
    fn clear_dir_empties_an_existing_dir() -> io::Result<()> {
        let tmp = tempfile::tempdir()?;
        let dir = tmp.path().join("frames");
        fs::create_dir(&dir)?;
        fs::write(dir.join("leftover"), b"x")?;

        clear_dir(&dir)?;
        assert!(fs::read_dir(&dir)?.next().is_none());
        Ok(())
    }

    #[test]
    fn clear_dir_creates_a_missing_dir() -> io::Result<()> {
        let tmp = tempfile::tempdir()?;
        let dir = tmp.path().join("does").join("not").join("exist");

        clear_dir(&dir)?;
        assert!(dir.is_dir());
        Ok(())
    }
}
