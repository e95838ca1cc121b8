use unicode_segmentation::UnicodeSegmentation;

pub fn substr_up_to_len(s: &str, max_len: usize) -> String {
    if s.len() > max_len {
        s.graphemes(true).take(max_len).collect::<String>()
    } else {
        s.to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_strings_are_kept() {
        assert_eq!(substr_up_to_len("Ave", 20), "Ave");
    }

    #[test]
    fn long_strings_are_cut_on_graphemes() {
        assert_eq!(substr_up_to_len("Gallia est omnis divisa", 6), "Gallia");
        assert_eq!(substr_up_to_len("pṓpulus Rōmānus", 3), "pṓp");
    }
}
