use std::io::{BufRead, BufReader, BufWriter, Write};

/// Opens `input` for buffered reading.
///
/// `stdin` reads from standard input; files ending in `.gz` are decompressed on the fly.
///
/// ```
/// use std::io::BufRead;
/// let dir = tempfile::tempdir().unwrap();
/// let path = dir.path().join("refpos.txt");
/// std::fs::write(&path, "10\n11\n12\n").unwrap();
///
/// let reader = msaprep::reader(path.to_str().unwrap()).unwrap();
/// assert_eq!(reader.lines().count(), 3);
/// ```
pub fn reader(input: &str) -> std::io::Result<Box<dyn BufRead>> {
    let reader: Box<dyn BufRead> = if input == "stdin" {
        Box::new(BufReader::new(std::io::stdin()))
    } else {
        let path = std::path::Path::new(input);
        let file = std::fs::File::open(path)?;

        if path.extension() == Some(std::ffi::OsStr::new("gz")) {
            Box::new(BufReader::new(flate2::read::MultiGzDecoder::new(file)))
        } else {
            Box::new(BufReader::new(file))
        }
    };

    Ok(reader)
}

pub fn writer(output: &str) -> std::io::Result<Box<dyn Write>> {
    let writer: Box<dyn Write> = if output == "stdout" {
        Box::new(BufWriter::new(std::io::stdout()))
    } else {
        Box::new(BufWriter::new(std::fs::File::create(output)?))
    };

    Ok(writer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use std::io::Read;
    use tempfile::tempdir;

    #[test]
    fn test_reader_gz() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("aln.fa.gz");
        {
            let file = std::fs::File::create(&path).unwrap();
            let mut encoder = GzEncoder::new(file, flate2::Compression::default());
            writeln!(encoder, ">s1\nACDE").unwrap();
        }

        let mut content = String::new();
        reader(path.to_str().unwrap())
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, ">s1\nACDE\n");
    }

    #[test]
    fn test_reader_missing() {
        assert!(reader("tests/no/such/file.fa").is_err());
    }
}
