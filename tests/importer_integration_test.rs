// ==========================================
// 导入集成测试
// ==========================================
// 测试目标: CSV → 配合比/生产计划 → SQLite 文档
// ==========================================


use std::io::Write;

use tempfile::NamedTempFile;
use test_helpers::create_seeded_state;

fn csv_file(lines: &[&str]) -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
    for line in lines {
        writeln!(file, "{}", line).unwrap();
    }
    file
}

#[test]
fn test_import_formulas_and_use_in_batch() {
    let (_tmp, state) = create_seeded_state().expect("Failed to create state");

    let file = csv_file(&[
        "id,mutuBeton,mutuCode,pasir1,batu1,semen,air,additive1",
        "F-K300,K300,,650,1000,400,185,2.5",
        ",K100,,1,1,1,1,1",
    ]);
    let res = state.import_api.import_formulas(file.path()).unwrap();
    assert_eq!(res.imported, 1);
    assert_eq!(res.skipped.len(), 1);

    let formulas = state.formula_repo.list().unwrap();
    assert_eq!(formulas.len(), 2);

    let api = &state.control_panel_api;
    api.set_formula(Some("F-K300")).unwrap();
    api.set_target_volume(2.0);
    let targets = api.target_weights();
    assert_eq!(targets.semen, 800.0);
    assert_eq!(targets.additive1, 5.0);
}

#[test]
fn test_import_schedule_appends_rows() {
    let (_tmp, state) = create_seeded_state().expect("Failed to create state");

    let file = csv_file(&[
        "no,noPo,namaPelanggan,lokasiProyek,mutuBeton,slump,mediaPengecoran,volume,terkirim,penambahanVol,status",
        "B1,PO-9,PT Karya,Gedung A,K225,12,Pompa,8,3,1,Proses",
        "B2,PO-10,PT Karya,Gedung B,K225,,,5,,,",
    ]);
    let res = state.import_api.import_schedule(file.path()).unwrap();
    assert_eq!(res.imported, 2);

    let records = state.schedule_api.load_records().unwrap();
    assert_eq!(records.len(), 4);
    assert_eq!(records[2].no, "B1");
    assert_eq!(records[2].sisa, "5.00");
    assert_eq!(records[2].total_vol, "9.00");
    assert_eq!(records[2].status, "Proses");
    assert_eq!(records[3].status, "Menunggu");

    // 新导入的行可直接用于批次
    let api = &state.control_panel_api;
    let assessment = api.set_req_no("B1");
    assert!(assessment.active_row.is_some());
    assert_eq!(api.job().medium, "Pompa");
}

#[test]
fn test_import_rejects_unsupported_file() {
    let (_tmp, state) = create_seeded_state().expect("Failed to create state");
    let file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
    assert!(state.import_api.import_schedule(file.path()).is_err());
}
