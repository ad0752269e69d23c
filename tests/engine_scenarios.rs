// End-to-end engine scenarios over real files through the public API.
use std::path::PathBuf;

use csvstore::api::{DataSource, Engine, EngineOptions, ErrorKind, tokenize};

fn store_with(contents: &str) -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("data.csv");
    std::fs::write(&path, contents).expect("write");
    (dir, path)
}

#[test]
fn two_line_store_serves_cells() {
    let (_dir, path) = store_with("a,b,c\n1,2,3\n");
    let mut engine = Engine::open(&path, EngineOptions::new());
    assert_eq!(engine.row_count(), 2);
    assert_eq!(engine.column_count(), 3);
    assert_eq!(engine.get_item(0, 1), "b");
    assert_eq!(engine.get_item(1, 2), "3");
}

#[test]
fn append_then_read_new_last_row() {
    let (_dir, path) = store_with("a,b,c\n1,2,3\n");
    let mut engine = Engine::open(&path, EngineOptions::new().with_appendable(true));
    engine.append("x,y,z").expect("append");
    assert_eq!(engine.row_count(), 3);
    assert_eq!(engine.get_item(2, 0), "x");
    assert_eq!(engine.read_line(2).expect("line 2"), "x,y,z");
}

#[test]
fn quoted_field_keeps_embedded_delimiter() {
    assert_eq!(tokenize(r#""hello, world",42"#, ','), vec!["hello, world", "42"]);
    assert_eq!(tokenize(r#""a,b",c,"d""e""#, ','), vec!["a,b", "c", "d\"e"]);
}

#[test]
fn narrow_row_is_padded() {
    let (_dir, path) = store_with("a,b,c\nx,y\n");
    let mut engine = Engine::open(&path, EngineOptions::new());
    assert_eq!(engine.get_item(1, 2), "");
    assert_eq!(engine.row(1).expect("row"), vec!["x", "y", ""]);
}

#[test]
fn out_of_bounds_rows_are_empty() {
    let (_dir, path) = store_with("a,b,c\n1,2,3\n");
    let mut engine = Engine::open(&path, EngineOptions::new());
    assert_eq!(engine.get_item(-1, 0), "");
    assert_eq!(engine.get_item(100, 0), "");
    assert_eq!(engine.get_item(0, -5), "");
}

#[test]
fn empty_store_has_no_rows_or_columns() {
    let (_dir, path) = store_with("");
    let mut engine = Engine::open(&path, EngineOptions::new());
    assert!(engine.is_open());
    assert_eq!(engine.row_count(), 0);
    assert_eq!(engine.column_count(), 0);
    assert_eq!(
        engine.read_line(0).expect_err("empty").kind(),
        ErrorKind::OutOfRange
    );
}

#[test]
fn trailing_delimiter_yields_no_trailing_field() {
    let (_dir, path) = store_with("a,b,\n");
    let engine = Engine::open(&path, EngineOptions::new());
    assert_eq!(engine.column_count(), 2);
}

#[test]
fn every_line_reads_back_its_own_bytes() {
    let lines = ["id,name,score", " 1 , ann , 9", "2,\"bob, jr\",7", "3,cy,"];
    let contents = format!("{}\r\n{}\n{}\r{}", lines[0], lines[1], lines[2], lines[3]);
    let (_dir, path) = store_with(&contents);
    let mut engine = Engine::open(&path, EngineOptions::new().with_chunk_size(3));
    assert_eq!(engine.row_count(), lines.len());
    for (number, line) in lines.iter().enumerate() {
        assert_eq!(engine.read_line(number).expect("line"), line.trim());
    }
}

#[test]
fn column_width_never_shrinks() {
    let (_dir, path) = store_with("a\nb,c,d\ne,f\ng\n");
    let mut engine = Engine::open(&path, EngineOptions::new());
    let mut last = engine.column_count();
    for row in 0..engine.row_count() as i64 {
        let _ = engine.get_item(row, 0);
        assert!(engine.column_count() >= last);
        last = engine.column_count();
    }
    assert_eq!(last, 3);
    assert_eq!(engine.row(3).expect("row 3"), vec!["g", "", ""]);
}

#[test]
fn appends_survive_reopen() {
    let (_dir, path) = store_with("k,v\n");
    {
        let mut engine = Engine::open(&path, EngineOptions::new().with_appendable(true));
        for i in 0..50 {
            engine.append(&format!("key{i},{i}")).expect("append");
        }
        assert_eq!(engine.row_count(), 51);
    }
    let mut engine = Engine::open(&path, EngineOptions::new());
    assert_eq!(engine.row_count(), 51);
    assert_eq!(engine.cell_value(50, 0), "key49");
    assert_eq!(engine.cell_value(26, 1), "25");
}
