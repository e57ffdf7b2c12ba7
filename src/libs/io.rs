use anyhow::Context;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Opens `input` for buffered reading. `stdin` reads from the terminal and
/// files ending in `.gz` are decompressed on the fly.
///
/// ```
/// use std::io::BufRead;
/// let dir = tempfile::tempdir().unwrap();
/// let path = dir.path().join("lengths.tsv");
/// std::fs::write(&path, "ctg1\t100\nctg2\t200\n").unwrap();
///
/// let reader = hiscaf::reader(path.to_str().unwrap()).unwrap();
/// assert_eq!(reader.lines().count(), 2);
/// ```
pub fn reader(input: &str) -> anyhow::Result<Box<dyn BufRead>> {
    let reader: Box<dyn BufRead> = if input == "stdin" {
        Box::new(BufReader::new(std::io::stdin()))
    } else {
        let path = Path::new(input);
        let file = std::fs::File::open(path)
            .with_context(|| format!("could not open {}", path.display()))?;

        if path.extension() == Some(std::ffi::OsStr::new("gz")) {
            Box::new(BufReader::new(flate2::read::MultiGzDecoder::new(file)))
        } else {
            Box::new(BufReader::new(file))
        }
    };

    Ok(reader)
}

pub fn writer(output: &str) -> anyhow::Result<Box<dyn Write>> {
    let writer: Box<dyn Write> = if output == "stdout" {
        Box::new(BufWriter::new(std::io::stdout()))
    } else {
        let file = std::fs::File::create(output)
            .with_context(|| format!("could not create {}", output))?;
        Box::new(BufWriter::new(file))
    };

    Ok(writer)
}

/// Writes `path` through a temporary file in the same directory and renames it
/// into place once `fill` succeeds. A file that exists is therefore complete.
pub fn persist<P, F>(path: P, fill: F) -> anyhow::Result<()>
where
    P: AsRef<Path>,
    F: FnOnce(&mut dyn Write) -> anyhow::Result<()>,
{
    let path = path.as_ref();
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let tmp = tempfile::NamedTempFile::new_in(dir)
        .with_context(|| format!("could not create a temporary file in {}", dir.display()))?;
    {
        let mut buf = BufWriter::new(tmp.as_file());
        fill(&mut buf)?;
        buf.flush()?;
    }
    tmp.persist(path)
        .with_context(|| format!("could not write {}", path.display()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use tempfile::tempdir;

    #[test]
    fn read_plain_and_gz() {
        let dir = tempdir().unwrap();

        let plain = dir.path().join("a.tsv");
        std::fs::write(&plain, "x\t1\ny\t2\n").unwrap();
        let lines: Vec<_> = reader(plain.to_str().unwrap())
            .unwrap()
            .lines()
            .map(|l| l.unwrap())
            .collect();
        assert_eq!(lines, vec!["x\t1", "y\t2"]);

        let gz = dir.path().join("a.tsv.gz");
        {
            let file = std::fs::File::create(&gz).unwrap();
            let mut encoder = GzEncoder::new(file, flate2::Compression::default());
            write!(encoder, "x\t1\ny\t2\n").unwrap();
            encoder.finish().unwrap();
        }
        assert_eq!(reader(gz.to_str().unwrap()).unwrap().lines().count(), 2);
    }

    #[test]
    fn missing_input_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("absent.bed");
        assert!(reader(path.to_str().unwrap()).is_err());
    }

    #[test]
    fn persist_leaves_no_partial_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.tsv");

        let res = persist(&path, |w| {
            writeln!(w, "partial")?;
            anyhow::bail!("boom")
        });
        assert!(res.is_err());
        assert!(!path.exists());

        persist(&path, |w| {
            writeln!(w, "done")?;
            Ok(())
        })
        .unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "done\n");
    }
}
