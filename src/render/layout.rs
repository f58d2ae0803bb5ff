/// Approximate Helvetica advance widths at 1000 units/em. Layout uses these
/// fixed metrics so the same record always produces the same geometry, no
/// matter which font the rasterizer later finds on the system.
fn helvetica_width_1000(ch: char) -> f32 {
    match ch {
        ' ' => 278.0,
        '!'..='/' => 333.0,
        '0'..='9' => 556.0,
        ':'..='@' => 333.0,
        'I' | 'J' => 278.0,
        'M' | 'W' => 833.0,
        'A'..='Z' => 667.0,
        '['..='`' => 333.0,
        'f' | 'i' | 'j' | 'l' | 't' => 278.0,
        'm' | 'w' => 833.0,
        'a'..='z' => 556.0,
        '{'..='~' => 333.0,
        _ => 556.0,
    }
}

// Helvetica-Bold runs roughly 6% wider than the regular cut.
const BOLD_WIDTH_FACTOR: f32 = 1.06;

pub fn text_width(text: &str, size: f32, bold: bool) -> f32 {
    let units: f32 = text.chars().map(helvetica_width_1000).sum();
    let w = units * size / 1000.0;
    if bold { w * BOLD_WIDTH_FACTOR } else { w }
}

/// Greedy word wrap. Explicit newlines always break; a single word wider than
/// the line is split between characters.
pub fn wrap_text(text: &str, size: f32, bold: bool, max_width: f32) -> Vec<String> {
    let space_w = text_width(" ", size, bold);
    let mut lines = Vec::new();

    for paragraph in text.split('\n') {
        let mut current = String::new();
        let mut current_w = 0.0f32;

        for word in paragraph.split_whitespace() {
            let word_w = text_width(word, size, bold);

            if word_w > max_width {
                if !current.is_empty() {
                    lines.push(std::mem::take(&mut current));
                    current_w = 0.0;
                }
                for ch in word.chars() {
                    let ch_w = text_width(ch.encode_utf8(&mut [0; 4]), size, bold);
                    if current_w + ch_w > max_width && !current.is_empty() {
                        lines.push(std::mem::take(&mut current));
                        current_w = 0.0;
                    }
                    current.push(ch);
                    current_w += ch_w;
                }
                continue;
            }

            let proposed = if current.is_empty() {
                word_w
            } else {
                current_w + space_w + word_w
            };
            if proposed > max_width && !current.is_empty() {
                lines.push(std::mem::take(&mut current));
                current.push_str(word);
                current_w = word_w;
            } else {
                if !current.is_empty() {
                    current.push(' ');
                }
                current.push_str(word);
                current_w = proposed;
            }
        }

        lines.push(current);
    }

    // keep blank lines between paragraphs but drop trailing ones
    while lines.len() > 1 && lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    lines
}
