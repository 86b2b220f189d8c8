//! Save tables and charts under a timestamped directory for each run
//!
//! Everything an `Exporter` writes goes to
//! `<root>/<run timestamp>/<directories..>/<filename>.<csv|png>`, and the directories are made
//! as they are needed. Rendering the charts is left to a `Plotter`; this module decides where
//! they go and what they show.
use chrono::{Local, NaiveDateTime};
use ndarray::prelude::*;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use crate::errors::*;

pub const CSV_EXTENSION: &str = "csv";
pub const IMAGE_EXTENSION: &str = "png";
pub const TIMESTAMP_FORMAT: &str = "%Y.%m.%d %H.%M.%S";

/// Where one run's exports go
#[derive(Debug, Clone, PartialEq)]
pub struct ExportConfig {
    pub root: PathBuf,
    pub timestamp: NaiveDateTime,
    pub directories: Vec<String>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        ExportConfig::now("../results/")
    }
}

impl ExportConfig {
    /// A new run starting now
    pub fn now<P: Into<PathBuf>>(root: P) -> Self {
        ExportConfig::at(root, Local::now().naive_local())
    }

    pub fn at<P: Into<PathBuf>>(root: P, timestamp: NaiveDateTime) -> Self {
        ExportConfig { root: root.into(), timestamp: timestamp, directories: vec![] }
    }
}

#[derive(Debug, Clone)]
pub struct Exporter {
    config: ExportConfig,
}

impl Exporter {
    pub fn new(config: ExportConfig) -> Self {
        Exporter { config: config }
    }

    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    /// Same run, different subdirectory (replaces the current one)
    pub fn with_directories<I, S>(&self, directories: I) -> Exporter
        where I: IntoIterator<Item=S>, S: Into<String> {
        let mut config = self.config.clone();
        config.directories = directories.into_iter().map(Into::into).collect();
        Exporter { config: config }
    }

    /// The directory of the current subdirectory, not created yet
    pub fn directory(&self) -> PathBuf {
        let mut path = self.config.root.join(self.config.timestamp.format(TIMESTAMP_FORMAT).to_string());
        for segment in &self.config.directories {
            path.push(segment);
        }
        path
    }

    /// Full path for an export, creating the directories on the way
    pub fn compute_path(&self, filename: &str, extension: &str) -> Result<PathBuf> {
        let directory = self.directory();
        fs::create_dir_all(&directory)?;
        Ok(directory.join(format!("{}.{}", filename, extension)))
    }

    /// Write a table as CSV, optionally with a leading index column
    pub fn export_csv(&self, table: &Table, filename: &str, index: bool) -> Result<PathBuf> {
        let path = self.compute_path(filename, CSV_EXTENSION)?;
        table.write_csv(&path, index)?;
        debug!("Exported {} rows to {}", table.rows.len(), path.display());
        Ok(path)
    }

    /// Write a confusion matrix as CSV, labelled by category on both axes
    pub fn export_matrix_csv(&self, matrix: &Array2<usize>, categories: &[String], filename: &str)
        -> Result<PathBuf> {
        check_confusion_matrix(matrix, categories)?;
        let mut table = Table::new(categories.to_vec());
        table.index = Some(categories.to_vec());
        for row in matrix.outer_iter() {
            table.push(row.iter().map(|count| count.to_string()).collect())?;
        }
        self.export_csv(&table, filename, true)
    }

    /// Heatmap of a confusion matrix: true labels down the side, predictions across
    pub fn export_confusion_matrix(&self, matrix: &Array2<usize>, categories: &[String],
                                   filename: &str, plotter: &mut dyn Plotter) -> Result<PathBuf> {
        check_confusion_matrix(matrix, categories)?;
        let path = self.compute_path(filename, IMAGE_EXTENSION)?;
        let chart = Heatmap {
            values: matrix.mapv(|count| count as f64),
            x_ticks: categories.to_vec(),
            y_ticks: categories.to_vec(),
            x_label: "Predicted Label".to_string(),
            y_label: "True Label".to_string(),
            annotate: true,
            colormap: "Blues".to_string(),
        };
        plotter.heatmap(&path, &chart)?;
        Ok(path)
    }

    /// Bar chart of named scores on a 0..1 axis
    pub fn export_metrics_bar_graph(&self, metrics: &[Metric], filename: &str,
                                    plotter: &mut dyn Plotter) -> Result<PathBuf> {
        let chart = BarChart {
            x_values: metrics.iter().map(|m| m.name.clone()).collect(),
            y_values: metrics.iter().map(|m| m.score).collect(),
            x_label: Some("Metrics".to_string()),
            y_label: Some("Score".to_string()),
            y_lim: Some((0.0, 1.0)),
            ..BarChart::default()
        };
        self.bar_chart(&chart, filename, plotter)
    }

    pub fn bar_chart(&self, chart: &BarChart, filename: &str, plotter: &mut dyn Plotter)
        -> Result<PathBuf> {
        if chart.x_values.len() != chart.y_values.len() {
            return Err(Error::InvalidDimensions(format!(
                "{} bar names but {} bar heights", chart.x_values.len(), chart.y_values.len())));
        }
        let path = self.compute_path(filename, IMAGE_EXTENSION)?;
        plotter.bar_chart(&path, chart)?;
        Ok(path)
    }
}

fn check_confusion_matrix(matrix: &Array2<usize>, categories: &[String]) -> Result<()> {
    let (rows, cols) = matrix.dim();
    if rows != cols || rows != categories.len() {
        return Err(Error::InvalidDimensions(format!(
            "a confusion matrix for {} categories must be {}x{}, not {}x{}",
            categories.len(), categories.len(), categories.len(), rows, cols)));
    }
    Ok(())
}

/// A named score, such as accuracy or F1
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metric {
    pub name: String,
    pub score: f64,
}

impl Metric {
    pub fn new<S: Into<String>>(name: S, score: f64) -> Self {
        Metric { name: name.into(), score: score }
    }
}

/// Plain rows of text cells under a header
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    /// Row labels. Rows are numbered from 0 when this is missing.
    pub index: Option<Vec<String>>,
}

impl Table {
    pub fn new(headers: Vec<String>) -> Self {
        Table { headers: headers, rows: vec![], index: None }
    }

    pub fn push(&mut self, row: Vec<String>) -> Result<()> {
        if row.len() != self.headers.len() {
            return Err(Error::InvalidDimensions(format!(
                "row has {} cells but the table has {} columns", row.len(), self.headers.len())));
        }
        self.rows.push(row);
        Ok(())
    }

    fn index_label(&self, row_i: usize) -> String {
        match self.index {
            Some(ref labels) => labels.get(row_i).cloned().unwrap_or_default(),
            None => row_i.to_string(),
        }
    }

    pub fn write_csv<P: AsRef<Path>>(&self, path: P, index: bool) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        let mut header: Vec<&str> = self.headers.iter().map(|h| h.as_str()).collect();
        if index { header.insert(0, ""); }
        write_csv_line(&mut writer, &header)?;
        for (row_i, row) in self.rows.iter().enumerate() {
            let label = self.index_label(row_i);
            let mut cells: Vec<&str> = row.iter().map(|c| c.as_str()).collect();
            if index { cells.insert(0, label.as_str()); }
            write_csv_line(&mut writer, &cells)?;
        }
        writer.flush()?;
        Ok(())
    }
}

fn write_csv_line<W: Write>(writer: &mut W, cells: &[&str]) -> Result<()> {
    let line: Vec<String> = cells.iter().map(|cell| csv_cell(cell)).collect();
    writeln!(writer, "{}", line.join(","))?;
    Ok(())
}

fn csv_cell(cell: &str) -> String {
    if cell.contains(|c: char| c == ',' || c == '"' || c == '\n' || c == '\r') {
        format!("\"{}\"", cell.replace('"', "\"\""))
    } else {
        cell.to_string()
    }
}

//
// Charts
//

/// Draws charts to image files
pub trait Plotter {
    fn heatmap(&mut self, path: &Path, chart: &Heatmap) -> Result<()>;
    fn bar_chart(&mut self, path: &Path, chart: &BarChart) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Heatmap {
    pub values: Array2<f64>,
    pub x_ticks: Vec<String>,
    pub y_ticks: Vec<String>,
    pub x_label: String,
    pub y_label: String,
    /// Write each value in its cell
    pub annotate: bool,
    pub colormap: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Margins {
    pub bottom: Option<f64>,
    pub left: Option<f64>,
    pub top: Option<f64>,
    pub right: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarChart {
    pub x_values: Vec<String>,
    pub y_values: Vec<f64>,
    /// Figure size in inches
    pub figsize: (f64, f64),
    /// Print each bar's height (2 decimals) on top of it
    pub label_bars: bool,
    pub x_label: Option<String>,
    pub y_label: Option<String>,
    pub x_rot: Option<f64>,
    pub y_rot: Option<f64>,
    pub margins: Option<Margins>,
    pub x_lim: Option<(f64, f64)>,
    pub y_lim: Option<(f64, f64)>,
}

impl Default for BarChart {
    fn default() -> Self {
        BarChart {
            x_values: vec![],
            y_values: vec![],
            figsize: (10.0, 4.0),
            label_bars: true,
            x_label: None,
            y_label: None,
            x_rot: None,
            y_rot: None,
            margins: None,
            x_lim: None,
            y_lim: None,
        }
    }
}

/// Plotter that saves each chart's description as JSON beside the image path
///
/// For handing charts to an external renderer. `figure.png` is described in `figure.json`.
#[derive(Debug, Default)]
pub struct ChartSpecWriter {
    pub written: Vec<PathBuf>,
}

impl ChartSpecWriter {
    fn write<T: Serialize>(&mut self, path: &Path, kind: &str, chart: &T) -> Result<()> {
        let spec_path = path.with_extension("json");
        let mut writer = BufWriter::new(File::create(&spec_path)?);
        serde_json::to_writer_pretty(&mut writer, &serde_json::json!({
            "kind": kind,
            "image": path.to_string_lossy(),
            "chart": chart,
        }))?;
        writer.flush()?;
        self.written.push(spec_path);
        Ok(())
    }
}

impl Plotter for ChartSpecWriter {
    fn heatmap(&mut self, path: &Path, chart: &Heatmap) -> Result<()> {
        self.write(path, "heatmap", chart)
    }
    fn bar_chart(&mut self, path: &Path, chart: &BarChart) -> Result<()> {
        self.write(path, "bar_chart", chart)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn exporter(dir: &TempDir) -> Exporter {
        let at = NaiveDate::from_ymd_opt(2023, 4, 5).unwrap().and_hms_opt(6, 7, 8).unwrap();
        Exporter::new(ExportConfig::at(dir.path(), at))
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[derive(Default)]
    struct Recorder {
        heatmaps: Vec<(PathBuf, Heatmap)>,
        bars: Vec<(PathBuf, BarChart)>,
    }

    impl Plotter for Recorder {
        fn heatmap(&mut self, path: &Path, chart: &Heatmap) -> Result<()> {
            self.heatmaps.push((path.to_path_buf(), chart.clone()));
            Ok(())
        }
        fn bar_chart(&mut self, path: &Path, chart: &BarChart) -> Result<()> {
            self.bars.push((path.to_path_buf(), chart.clone()));
            Ok(())
        }
    }

    #[test]
    fn paths_follow_run_and_directories() {
        let dir = TempDir::new().unwrap();
        let exporter = exporter(&dir).with_directories(vec!["speech", "task 1"]);
        let path = exporter.compute_path("rates", CSV_EXTENSION).unwrap();
        assert_eq!(path, dir.path().join("2023.04.05 06.07.08").join("speech").join("task 1").join("rates.csv"));
        assert!(path.parent().unwrap().is_dir());
    }

    #[test]
    fn directories_do_not_leak_between_exporters() {
        let dir = TempDir::new().unwrap();
        let base = exporter(&dir);
        let nested = base.with_directories(vec!["a"]);
        assert_eq!(base.directory(), dir.path().join("2023.04.05 06.07.08"));
        assert_eq!(nested.directory(), dir.path().join("2023.04.05 06.07.08").join("a"));
    }

    #[test]
    fn csv_with_index_and_quoting() {
        let dir = TempDir::new().unwrap();
        let mut table = Table::new(strings(&["Subject", "Note"]));
        table.push(strings(&["s01", "fast, clear"])).unwrap();
        table.push(strings(&["s02", "said \"olá\""])).unwrap();
        let path = exporter(&dir).export_csv(&table, "notes", true).unwrap();
        let text = fs::read_to_string(path).unwrap();
        assert_eq!(text, ",Subject,Note\n0,s01,\"fast, clear\"\n1,s02,\"said \"\"olá\"\"\"\n");
    }

    #[test]
    fn rows_must_match_headers() {
        let mut table = Table::new(strings(&["a", "b"]));
        assert!(table.push(strings(&["only one"])).is_err());
    }

    #[test]
    fn confusion_matrix_goes_to_plotter() {
        let dir = TempDir::new().unwrap();
        let mut plotter = Recorder::default();
        let matrix = arr2(&[[3, 1], [0, 4]]);
        let path = exporter(&dir)
            .export_confusion_matrix(&matrix, &strings(&["pos", "neg"]), "confusion", &mut plotter)
            .unwrap();
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some(IMAGE_EXTENSION));
        let (ref drawn_at, ref chart) = plotter.heatmaps[0];
        assert_eq!(drawn_at, &path);
        assert_eq!(chart.values[[0, 1]], 1.0);
        assert_eq!(chart.y_label, "True Label");
    }

    #[test]
    fn confusion_matrix_must_be_square() {
        let dir = TempDir::new().unwrap();
        let matrix = Array2::<usize>::zeros((2, 3));
        match exporter(&dir).export_matrix_csv(&matrix, &strings(&["a", "b"]), "bad") {
            Err(Error::InvalidDimensions(_)) => {}
            other => panic!("expected a dimension error, got {:?}", other),
        }
    }

    #[test]
    fn confusion_matrix_csv() {
        let dir = TempDir::new().unwrap();
        let matrix = arr2(&[[3, 1], [0, 4]]);
        let path = exporter(&dir).export_matrix_csv(&matrix, &strings(&["pos", "neg"]), "cm").unwrap();
        assert_eq!(fs::read_to_string(path).unwrap(), ",pos,neg\npos,3,1\nneg,0,4\n");
    }

    #[test]
    fn metrics_bar_graph() {
        let dir = TempDir::new().unwrap();
        let mut plotter = Recorder::default();
        let metrics = vec![Metric::new("accuracy", 0.8), Metric::new("f1", 0.75)];
        exporter(&dir).export_metrics_bar_graph(&metrics, "scores", &mut plotter).unwrap();
        let chart = &plotter.bars[0].1;
        assert_eq!(chart.x_values, strings(&["accuracy", "f1"]));
        assert_eq!(chart.y_lim, Some((0.0, 1.0)));
        assert_eq!(chart.figsize, (10.0, 4.0));
    }

    #[test]
    fn chart_specs_are_written_beside_images() {
        let dir = TempDir::new().unwrap();
        let mut plotter = ChartSpecWriter::default();
        let metrics = vec![Metric::new("recall", 0.5)];
        let image = exporter(&dir).export_metrics_bar_graph(&metrics, "scores", &mut plotter).unwrap();
        let spec: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(image.with_extension("json")).unwrap()).unwrap();
        assert_eq!(spec["kind"], "bar_chart");
        assert_eq!(spec["chart"]["y_values"][0], 0.5);
    }
}
