use crate::subprocess::OutputLogConfig;

/// Cut `line` to at most `max` bytes on a char boundary, marking the cut.
pub(super) fn truncate_line(line: &str, max: usize) -> String {
    if line.len() <= max {
        return line.to_string();
    }
    let mut end = max;
    while !line.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &line[..end])
}

/// Last `stderr_tail_lines` lines of `text`, each truncated.
pub(super) fn tail(text: &str, cfg: &OutputLogConfig) -> String {
    let lines: Vec<_> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    let from = lines.len().saturating_sub(cfg.stderr_tail_lines);
    lines[from..]
        .iter()
        .map(|l| truncate_line(l, cfg.max_line_length))
        .collect::<Vec<_>>()
        .join("\n")
}
