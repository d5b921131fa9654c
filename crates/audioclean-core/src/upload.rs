//! Uploaded files and container sniffing

use serde::Serialize;
use std::path::Path;

/// Container format, from magic bytes or the declared extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    Wav,
    Mp3,
    Flac,
    Ogg,
}

impl AudioFormat {
    /// Detect from the first bytes of the stream
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        match bytes {
            [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'A', b'V', b'E', ..] => Some(AudioFormat::Wav),
            [b'I', b'D', b'3', ..] => Some(AudioFormat::Mp3),
            // MPEG audio frame sync: 11 set bits
            [0xFF, b, ..] if b & 0xE0 == 0xE0 => Some(AudioFormat::Mp3),
            [b'f', b'L', b'a', b'C', ..] => Some(AudioFormat::Flac),
            [b'O', b'g', b'g', b'S', ..] => Some(AudioFormat::Ogg),
            _ => None,
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "wav" | "wave" => Some(AudioFormat::Wav),
            "mp3" => Some(AudioFormat::Mp3),
            "flac" => Some(AudioFormat::Flac),
            "ogg" | "oga" => Some(AudioFormat::Ogg),
            _ => None,
        }
    }
}

impl std::fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AudioFormat::Wav => write!(f, "WAV"),
            AudioFormat::Mp3 => write!(f, "MP3"),
            AudioFormat::Flac => write!(f, "FLAC"),
            AudioFormat::Ogg => write!(f, "Ogg"),
        }
    }
}

/// A named audio blob as received from the user
#[derive(Debug, Clone)]
pub struct UploadedFile {
    name: String,
    bytes: Vec<u8>,
    format: Option<AudioFormat>,
}

impl UploadedFile {
    /// Sniffed format wins over the declared extension
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let name = name.into();
        let format = AudioFormat::sniff(&bytes).or_else(|| {
            Path::new(&name)
                .extension()
                .and_then(|e| e.to_str())
                .and_then(AudioFormat::from_extension)
        });

        Self {
            name,
            bytes,
            format,
        }
    }

    /// Read a file from disk, named after its final path component
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self::new(name, bytes))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn format(&self) -> Option<AudioFormat> {
        self.format
    }

    pub fn extension(&self) -> Option<&str> {
        Path::new(&self.name).extension().and_then(|e| e.to_str())
    }
}

/// Sanitize an uploaded name for use as an archive entry or file name
pub fn sanitize_filename(name: &str) -> String {
    // Drop any directory part, whichever separator the client used
    let base = name.rsplit(&['/', '\\'][..]).next().unwrap_or(name);

    let cleaned = base
        .chars()
        .map(|c| match c {
            ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            _ => c,
        })
        .collect::<String>()
        .trim()
        .to_string();

    if cleaned.is_empty() || cleaned == "." || cleaned == ".." {
        "audio".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sniff_magic() {
        assert_eq!(AudioFormat::sniff(b"RIFF\x24\x00\x00\x00WAVEfmt "), Some(AudioFormat::Wav));
        assert_eq!(AudioFormat::sniff(b"ID3\x04\x00"), Some(AudioFormat::Mp3));
        assert_eq!(AudioFormat::sniff(&[0xFF, 0xFB, 0x90, 0x00]), Some(AudioFormat::Mp3));
        assert_eq!(AudioFormat::sniff(b"fLaC\x00"), Some(AudioFormat::Flac));
        assert_eq!(AudioFormat::sniff(b"OggS\x00"), Some(AudioFormat::Ogg));
        assert_eq!(AudioFormat::sniff(b"RIFF\x24\x00\x00\x00AVI "), None);
        assert_eq!(AudioFormat::sniff(b""), None);
    }

    #[test]
    fn test_declared_extension_fallback() {
        let file = UploadedFile::new("song.MP3", vec![0, 1, 2, 3]);
        assert_eq!(file.format(), Some(AudioFormat::Mp3));

        let unknown = UploadedFile::new("notes.txt", b"hello".to_vec());
        assert_eq!(unknown.format(), None);
    }

    #[test]
    fn test_sniff_beats_extension() {
        let file = UploadedFile::new("mislabeled.mp3", b"RIFF\x24\x00\x00\x00WAVE".to_vec());
        assert_eq!(file.format(), Some(AudioFormat::Wav));
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("a.wav"), "a.wav");
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("C:\\Users\\me\\take 1.wav"), "take 1.wav");
        assert_eq!(sanitize_filename("what?.mp3"), "what_.mp3");
        assert_eq!(sanitize_filename("  "), "audio");
        assert_eq!(sanitize_filename("dir/"), "audio");
    }
}
