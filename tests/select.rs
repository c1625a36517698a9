mod common;

use common::{fixture_path, sheet_from_fields};
use payroll_detect::{
    detect::{DetectOptions, detect_columns, to_one_indexed_mapping},
    io_utils,
    select::{national_id_count, select_best_sheet, select_sheet},
    sheet::Workbook,
};

fn fixture_workbook() -> Workbook {
    io_utils::load_json_workbook(&fixture_path("payroll_workbook.json")).expect("load workbook")
}

#[test]
fn keyword_sheet_is_chosen_over_summary() {
    let workbook = fixture_workbook();
    assert_eq!(
        select_best_sheet(&workbook).as_deref(),
        Some("2024년 1월 임금대장")
    );
}

#[test]
fn selected_sheet_detects_two_level_header() {
    let workbook = fixture_workbook();
    let name = select_best_sheet(&workbook).expect("sheet selected");
    let result = detect_columns(&workbook, &name).expect("detected");

    assert_eq!(result.header_row, 2);
    assert_eq!(result.data_start_row, 4);
    let mapping = to_one_indexed_mapping(&result);
    assert_eq!(mapping.get("name"), Some(&1));
    assert_eq!(mapping.get("nationalId"), Some(&2));
    assert_eq!(mapping.get("joinDate"), Some(&3));
    assert_eq!(mapping.get("leaveDate"), Some(&4));
    assert_eq!(mapping.get("wage"), Some(&7));
    assert_eq!(mapping.get("phone"), None);
}

#[test]
fn id_density_decides_when_no_name_matches() {
    let workbook = Workbook::new(vec![
        sheet_from_fields("Sheet1", &[&["메모"], &["2024-01-15"], &["작성자"]]),
        sheet_from_fields(
            "Sheet2",
            &[
                &["성명", "주민번호"],
                &["김철수", "950101-1234567"],
                &["이영희", "880315-2345678"],
            ],
        ),
        sheet_from_fields("Sheet3", &[&["9501011234567"]]),
    ]);
    assert_eq!(national_id_count(&workbook.sheets[1]), 2);
    assert_eq!(select_best_sheet(&workbook).as_deref(), Some("Sheet2"));
}

#[test]
fn first_sheet_is_the_last_resort() {
    let workbook = Workbook::new(vec![
        sheet_from_fields("Sheet1", &[&["a"]]),
        sheet_from_fields("Sheet2", &[&["b"]]),
    ]);
    assert_eq!(select_best_sheet(&workbook).as_deref(), Some("Sheet1"));
    assert_eq!(select_best_sheet(&Workbook::default()), None);
}

#[test]
fn custom_keywords_replace_defaults() {
    let workbook = fixture_workbook();
    let options = DetectOptions {
        sheet_keywords: vec!["요약".to_string()],
        ..DetectOptions::default()
    };
    assert_eq!(select_sheet(&workbook, &options).as_deref(), Some("요약"));
}
