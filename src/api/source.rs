//! Purpose: Narrow row/column capability consumed by grid renderers.
//! Exports: `DataSource`.
//! Invariants: `cell_value` never fails; out-of-range or unreadable cells are `""`.
use crate::core::engine::Engine;

pub trait DataSource {
    fn row_count(&self) -> usize;
    fn column_count(&self) -> usize;
    /// Takes `&mut self` because a lookup may replace the resident line.
    fn cell_value(&mut self, row: i64, col: i64) -> &str;
}

impl DataSource for Engine {
    fn row_count(&self) -> usize {
        Engine::row_count(self)
    }

    fn column_count(&self) -> usize {
        Engine::column_count(self)
    }

    fn cell_value(&mut self, row: i64, col: i64) -> &str {
        self.get_item(row, col)
    }
}

#[cfg(test)]
mod tests {
    use super::DataSource;
    use crate::core::engine::{Engine, EngineOptions};

    fn render(source: &mut dyn DataSource) -> Vec<Vec<String>> {
        let rows = source.row_count() as i64;
        let cols = source.column_count() as i64;
        (0..rows)
            .map(|row| {
                (0..cols)
                    .map(|col| source.cell_value(row, col).to_string())
                    .collect()
            })
            .collect()
    }

    #[test]
    fn engine_renders_as_rectangular_grid() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("grid.csv");
        std::fs::write(&path, "name,qty,note\nbolt,4\n\"nut, hex\",10,\"say \"\"hi\"\"\"\n")
            .expect("write");

        let mut engine = Engine::open(&path, EngineOptions::new());
        let grid = render(&mut engine);
        assert_eq!(
            grid,
            vec![
                vec!["name", "qty", "note"],
                vec!["bolt", "4", ""],
                vec!["nut, hex", "10", "say \"hi\""],
            ]
        );
    }
}
