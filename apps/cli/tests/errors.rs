use std::error::Error;
use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

#[test]
fn missing_folder_is_invalid_input() -> Result<(), Box<dyn Error>> {
    Command::cargo_bin("pdfbatch")?
        .args(["/no/such/folder", "--printer", "Office Laser", "--dry-run"])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("folder does not exist"));

    Ok(())
}

#[test]
fn empty_folder_exits_with_the_no_files_code() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;

    Command::cargo_bin("pdfbatch")?
        .args([
            dir.path().to_str().unwrap(),
            "--printer",
            "Office Laser",
            "--dry-run",
        ])
        .assert()
        .failure()
        .code(3)
        .stderr(predicate::str::contains("no matching PDF files"));

    Ok(())
}

#[test]
fn unlocatable_tool_exits_before_anything_happens() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    fs::write(dir.path().join("a.pdf"), b"%PDF-1.4\n")?;

    Command::cargo_bin("pdfbatch")?
        .env("PATH", "")
        .args([
            dir.path().to_str().unwrap(),
            "--printer",
            "Office Laser",
            "--sumatra",
            "/no/such/SumatraPDF.exe",
        ])
        .assert()
        .failure()
        .code(4)
        .stderr(predicate::str::contains("SumatraPDF.exe not found"));

    Ok(())
}

#[test]
fn malformed_pages_expression_names_the_token() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    fs::write(dir.path().join("a.pdf"), b"%PDF-1.4\n")?;

    Command::cargo_bin("pdfbatch")?
        .args([
            dir.path().to_str().unwrap(),
            "--printer",
            "Office Laser",
            "--pages",
            "1,x,3",
            "--dry-run",
        ])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("invalid page token `x`"));

    Ok(())
}

#[test]
fn out_of_order_range_is_rejected() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    fs::write(dir.path().join("a.pdf"), b"%PDF-1.4\n")?;

    Command::cargo_bin("pdfbatch")?
        .args([
            dir.path().to_str().unwrap(),
            "--printer",
            "Office Laser",
            "--pages",
            "5-3",
            "--dry-run",
        ])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("out of order"));

    Ok(())
}

#[test]
fn zero_copies_is_rejected() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    fs::write(dir.path().join("a.pdf"), b"%PDF-1.4\n")?;

    Command::cargo_bin("pdfbatch")?
        .args([
            dir.path().to_str().unwrap(),
            "--printer",
            "Office Laser",
            "--copies",
            "0",
            "--dry-run",
        ])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("--copies"));

    Ok(())
}

#[test]
fn invalid_filter_glob_is_invalid_input() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    fs::write(dir.path().join("a.pdf"), b"%PDF-1.4\n")?;

    Command::cargo_bin("pdfbatch")?
        .args([
            dir.path().to_str().unwrap(),
            "--printer",
            "Office Laser",
            "--filter",
            "[unclosed",
            "--dry-run",
        ])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("invalid glob pattern"));

    Ok(())
}
