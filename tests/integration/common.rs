/// `count` distinct identifiers `tag0 tag1 ...`, `per_line` per line.
pub fn run_of(tag: &str, count: usize, per_line: usize) -> String {
    let mut out = String::new();
    for k in 0..count {
        out.push_str(&format!("{}{}", tag, k));
        let eol = (k + 1) % per_line == 0 || k + 1 == count;
        out.push(if eol { '\n' } else { ' ' });
    }
    out
}
