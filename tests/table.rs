use payroll_detect::table::{display_width, render_table};

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

#[test]
fn render_table_aligns_columns() {
    let headers = strings(&["field", "column"]);
    let rows = vec![strings(&["name", "2"]), strings(&["nationalId", "3"])];

    let rendered = render_table(&headers, &rows);
    let lines: Vec<&str> = rendered.lines().collect();

    assert_eq!(
        lines,
        vec!["field       column", "----------  ------", "name        2", "nationalId  3"]
    );
}

#[test]
fn render_table_flattens_multiline_captions() {
    let headers = strings(&["header"]);
    let rows = vec![strings(&["지급\n총액"])];

    let rendered = render_table(&headers, &rows);
    let lines: Vec<&str> = rendered.lines().collect();

    assert_eq!(lines.len(), 3);
    assert_eq!(lines[2], "지급 총액");
}

#[test]
fn render_table_counts_hangul_as_double_width() {
    let headers = strings(&["성명", "급여"]);
    let rows = vec![strings(&["김철수", "3000000"])];

    let rendered = render_table(&headers, &rows);
    let lines: Vec<&str> = rendered.lines().collect();

    assert_eq!(display_width("김철수"), 6);
    assert_eq!(lines[0], "성명    급여");
    assert_eq!(lines[2], "김철수  3000000");
}

#[test]
fn ansi_sequences_take_no_width() {
    assert_eq!(display_width("\u{1b}[31mLOW\u{1b}[0m"), 3);
    assert_eq!(display_width("café"), 4);
}
