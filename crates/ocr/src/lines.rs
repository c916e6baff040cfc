use crate::types::{TextDetection, TextLine};

/// Maximum vertical distance (px) between a detection and the open line.
pub const LINE_THRESHOLD: f32 = 8.0;

/// Group detections into top-to-bottom text lines using [`LINE_THRESHOLD`].
pub fn group_lines(detections: &[TextDetection]) -> Vec<TextLine> {
    group_lines_with_threshold(detections, LINE_THRESHOLD)
}

/// Sweep detections in order of vertical center, merging each into the open
/// line while it sits less than `threshold` from the line's anchor.
///
/// The anchor moves to the midpoint of itself and each joining detection
/// rather than the cluster mean, so gently sloping lines keep merging.
pub fn group_lines_with_threshold(detections: &[TextDetection], threshold: f32) -> Vec<TextLine> {
    let mut positioned: Vec<(f32, &str)> = detections
        .iter()
        .map(|d| (d.vertical_center(), d.text.trim()))
        .collect();
    positioned.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut lines = Vec::new();
    let mut anchor: Option<f32> = None;
    let mut buffer: Vec<&str> = Vec::new();

    for (y, text) in positioned {
        match anchor {
            Some(a) if (y - a).abs() < threshold => {
                anchor = Some((a + y) / 2.0);
            }
            Some(a) => {
                lines.push(TextLine::new(buffer.join(" "), a));
                buffer.clear();
                anchor = Some(y);
            }
            None => anchor = Some(y),
        }
        // Blank fragments still move the anchor but add no text.
        if !text.is_empty() {
            buffer.push(text);
        }
    }
    if let Some(a) = anchor {
        lines.push(TextLine::new(buffer.join(" "), a));
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: f32, text: &str) -> TextDetection {
        TextDetection::from_rect(0.0, y - 5.0, 40.0, 10.0, text, 0.9)
    }

    fn texts(lines: &[TextLine]) -> Vec<&str> {
        lines.iter().map(|l| l.text.as_str()).collect()
    }

    #[test]
    fn empty_input_yields_no_lines() {
        assert!(group_lines(&[]).is_empty());
    }

    #[test]
    fn fragments_on_one_row_merge_in_encounter_order() {
        let lines = group_lines(&[at(100.0, "WALMART"), at(103.0, "SUPERCENTER")]);
        assert_eq!(texts(&lines), vec!["WALMART SUPERCENTER"]);
        assert_eq!(lines[0].vertical_position, 101.5);
    }

    #[test]
    fn input_order_does_not_matter() {
        let lines = group_lines(&[at(60.0, "TOTAL $45.67"), at(20.0, "WALMART"), at(40.0, "MILK 3.99")]);
        assert_eq!(texts(&lines), vec!["WALMART", "MILK 3.99", "TOTAL $45.67"]);
    }

    #[test]
    fn just_under_threshold_merges_and_at_threshold_splits() {
        let merged = group_lines(&[at(10.0, "a"), at(17.9, "b")]);
        assert_eq!(merged.len(), 1);
        let split = group_lines(&[at(10.0, "a"), at(18.0, "b")]);
        assert_eq!(split.len(), 2);
    }

    #[test]
    fn anchor_follows_running_midpoint() {
        // Anchors: 0 → 3 → 6.5 → 10.25. Against the first member, 10 and 14
        // would split; against the anchor they all merge.
        let lines = group_lines(&[at(0.0, "a"), at(6.0, "b"), at(10.0, "c"), at(14.0, "d")]);
        assert_eq!(texts(&lines), vec!["a b c d"]);
        assert_eq!(lines[0].vertical_position, 10.25);
    }

    #[test]
    fn midpoint_not_mean_decides_the_split() {
        // Anchor after a,b,c is ((0+7)/2 + 7)/2 = 5.25; d at 13 is 7.75 away and
        // joins, though the mean (4.67) is 8.33 away.
        let lines = group_lines(&[at(0.0, "a"), at(7.0, "b"), at(7.0, "c"), at(13.0, "d")]);
        assert_eq!(texts(&lines), vec!["a b c d"]);
    }

    #[test]
    fn far_from_anchor_splits_even_if_near_previous_member() {
        // Anchor after a,b is 3.5; c at 12 is 5 from b but 8.5 from the anchor.
        let lines = group_lines(&[at(0.0, "a"), at(7.0, "b"), at(12.0, "c")]);
        assert_eq!(texts(&lines), vec!["a b", "c"]);
    }

    #[test]
    fn every_detection_lands_in_exactly_one_line() {
        let ys = [3.0, 4.0, 30.0, 31.0, 32.0, 90.0, 55.0, 200.0, 7.0];
        let detections: Vec<TextDetection> =
            ys.iter().enumerate().map(|(i, y)| at(*y, &format!("w{i}"))).collect();
        let lines = group_lines(&detections);

        let mut words: Vec<&str> = lines.iter().flat_map(|l| l.text.split(' ')).collect();
        words.sort();
        let mut expected: Vec<String> = (0..ys.len()).map(|i| format!("w{i}")).collect();
        expected.sort();
        assert_eq!(words, expected);

        assert!(lines.windows(2).all(|w| w[0].vertical_position < w[1].vertical_position));
    }

    #[test]
    fn texts_are_trimmed() {
        let lines = group_lines(&[at(5.0, "  TOTAL "), at(6.0, " 9.99")]);
        assert_eq!(texts(&lines), vec!["TOTAL 9.99"]);
    }

    #[test]
    fn blank_fragments_add_no_separator() {
        let lines = group_lines(&[at(10.0, "A"), at(11.0, "  "), at(12.0, "B")]);
        assert_eq!(texts(&lines), vec!["A B"]);
    }

    #[test]
    fn blank_fragment_still_drives_clustering() {
        // The blank at 6 pulls the anchor to 3, so 10 is 7 away and joins.
        let lines = group_lines(&[at(0.0, "A"), at(6.0, " "), at(10.0, "B")]);
        assert_eq!(texts(&lines), vec!["A B"]);
    }

    #[test]
    fn custom_threshold() {
        let dets = [at(0.0, "a"), at(15.0, "b")];
        assert_eq!(group_lines_with_threshold(&dets, 20.0).len(), 1);
        assert_eq!(group_lines_with_threshold(&dets, 8.0).len(), 2);
    }
}
