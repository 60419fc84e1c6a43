use std::{
    fs::{self, File},
    io::{self, BufWriter, StdoutLock},
    path::{Path, PathBuf},
};

use anyhow::Context;

/// JSON destination: a file, or stdout when no path is given.
#[derive(Debug)]
pub enum Output {
    Stdout {
        writer: StdoutLock<'static>,
    },
    File {
        writer: BufWriter<File>,
        path: PathBuf,
    },
}

impl Output {
    pub fn save_json<T>(value: &T, output_path: Option<PathBuf>) -> anyhow::Result<()>
    where
        T: serde::Serialize,
    {
        let mut output = Output::from_output_path(output_path)?;
        output.write_json(value)
    }

    pub fn from_output_path(output_path: Option<PathBuf>) -> anyhow::Result<Self> {
        match output_path {
            Some(path) => Output::create(path),
            None => Ok(Output::Stdout {
                writer: io::stdout().lock(),
            }),
        }
    }

    fn create(path: PathBuf) -> anyhow::Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create output directory: {}", parent.display())
            })?;
        }
        let file = File::create(&path)
            .with_context(|| format!("Failed to create output file: {}", path.display()))?;
        Ok(Output::File {
            writer: BufWriter::new(file),
            path,
        })
    }

    pub fn display_path(&self) -> String {
        match self {
            Output::Stdout { .. } => "stdout".to_owned(),
            Output::File { path, .. } => path.display().to_string(),
        }
    }

    pub fn write_json<T>(&mut self, value: &T) -> anyhow::Result<()>
    where
        T: serde::Serialize,
    {
        let display_path = self.display_path();
        let writer: &mut dyn io::Write = match self {
            Output::Stdout { writer } => writer,
            Output::File { writer, .. } => writer,
        };
        serde_json::to_writer_pretty(&mut *writer, value)
            .with_context(|| format!("Failed to write JSON to {display_path}"))?;
        writeln!(writer)
            .and_then(|()| writer.flush())
            .with_context(|| format!("Failed to flush output to {display_path}"))?;
        Ok(())
    }
}

pub fn read_json_file<T, P>(file_kind: &str, path: P) -> anyhow::Result<T>
where
    T: serde::de::DeserializeOwned,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let file = File::open(path)
        .with_context(|| format!("Failed to open {} file: {}", file_kind, path.display()))?;

    let reader = io::BufReader::new(file);
    let value = serde_json::from_reader(reader).with_context(|| {
        format!(
            "Failed to parse {} JSON file: {}",
            file_kind,
            path.display()
        )
    })?;

    Ok(value)
}

/// Serializes `value` as pretty JSON followed by a newline.
pub fn to_json_string<T>(file_kind: &str, value: &T) -> anyhow::Result<String>
where
    T: serde::Serialize,
{
    let mut json = serde_json::to_string_pretty(value)
        .with_context(|| format!("Failed to serialize {file_kind} to JSON"))?;
    json.push('\n');
    Ok(json)
}

/// Writes every `(path, contents)` pair after creating `dir`.
///
/// Each file is first written next to its target under a `.tmp` suffix. The
/// targets are only renamed into place once every temporary file is written,
/// so a failed write leaves none of the outputs behind.
pub fn write_outputs(dir: &Path, files: &[(&Path, &str)]) -> anyhow::Result<()> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;

    let mut staged = Vec::with_capacity(files.len());
    for (path, contents) in files {
        let tmp_path = staging_path(path);
        if let Err(e) = fs::write(&tmp_path, contents) {
            discard(&staged);
            return Err(e).with_context(|| {
                format!("Failed to write output file: {}", path.display())
            });
        }
        staged.push((tmp_path, *path));
    }

    for (i, (tmp_path, path)) in staged.iter().enumerate() {
        if let Err(e) = fs::rename(tmp_path, path) {
            discard(&staged[i..]);
            return Err(e).with_context(|| {
                format!("Failed to move output file into place: {}", path.display())
            });
        }
    }
    Ok(())
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

fn discard(staged: &[(PathBuf, &Path)]) {
    for (tmp_path, _) in staged {
        let _ = fs::remove_file(tmp_path);
    }
}
