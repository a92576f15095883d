//! Luau source download and staging
//!
//! `deps` downloads the upstream zip into a temporary file inside the staging
//! directory, extracts it with the archive's top-level folder stripped, and
//! reports which of the headers the build relies on are present.
//!
//! Nothing is transactional: a failed run can leave a partially extracted
//! tree behind, and `luaubuild clean` is the way back to a known state. The
//! temporary archive itself is removed on every exit path.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use sha2::{Digest, Sha256};
use zip::ZipArchive;

use crate::build::modules::CRITICAL_HEADERS;
use crate::config::{Layout, SourceConfig};
use crate::error::LuauBuildError;
use crate::utils::paths::{display_relative, ensure_dir, glob_files};
use crate::utils::terminal;

/// Where to download from and how to unpack it
#[derive(Debug, Clone, PartialEq)]
pub struct FetchOptions {
    pub url: String,
    pub archive_prefix: String,
    pub sha256: Option<String>,
    pub timeout: Duration,
}

impl From<&SourceConfig> for FetchOptions {
    fn from(source: &SourceConfig) -> Self {
        Self {
            url: source.url.clone(),
            archive_prefix: source.archive_prefix.clone(),
            sha256: source.sha256.clone(),
            timeout: Duration::from_secs(source.timeout_secs),
        }
    }
}

/// Counts from one extraction
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractStats {
    pub files: usize,
    pub directories: usize,
    /// Entries that were the stripped root itself or pointed outside it
    pub skipped: usize,
}

/// Outcome of a successful `deps`
#[derive(Debug, Clone, PartialEq)]
pub struct FetchReport {
    pub bytes: u64,
    pub sha256: String,
    pub extracted: ExtractStats,
    pub missing_headers: Vec<String>,
}

/// Downloads and stages the Luau sources
pub struct Fetcher<'a> {
    layout: &'a Layout,
    options: FetchOptions,
    verbose: bool,
}

impl<'a> Fetcher<'a> {
    pub fn new(layout: &'a Layout, options: FetchOptions, verbose: bool) -> Self {
        Self {
            layout,
            options,
            verbose,
        }
    }

    pub fn fetch(&self) -> Result<FetchReport, LuauBuildError> {
        let staging = &self.layout.staging_dir;
        ensure_dir(staging)?;

        let mut download = tempfile::Builder::new()
            .prefix(".luau-download-")
            .suffix(".zip")
            .tempfile_in(staging)
            .map_err(|e| LuauBuildError::io("create temporary file in", staging, e))?;

        terminal::print_info(&format!("Downloading {}", self.options.url));
        let (bytes, sha256) = self.download(download.as_file_mut())?;

        if let Some(expected) = &self.options.sha256 {
            if !expected.trim().eq_ignore_ascii_case(&sha256) {
                return Err(LuauBuildError::archive(
                    &self.options.url,
                    format!("SHA-256 mismatch: expected {}, got {}", expected.trim(), sha256),
                ));
            }
        }

        terminal::print_info(&format!(
            "Extracting {} into {}",
            terminal::format_size(bytes),
            display_relative(staging, &self.layout.working_dir)
        ));
        let extracted = extract_archive(download.path(), staging, &self.options.archive_prefix)?;

        let temp_path = download.path().to_path_buf();
        download
            .close()
            .map_err(|e| LuauBuildError::io("remove", temp_path, e))?;

        let missing_headers = verify_headers(staging);
        if self.verbose {
            list_include_dir(staging, "Analysis/include/Luau");
            list_include_dir(staging, "EqSat/include/Luau");
        }

        Ok(FetchReport {
            bytes,
            sha256,
            extracted,
            missing_headers,
        })
    }

    /// Stream the archive into `file`; returns its size and SHA-256
    fn download(&self, file: &mut File) -> Result<(u64, String), LuauBuildError> {
        let url = self.options.url.as_str();
        let mut writer = HashingWriter::new(file);

        if let Some(path) = local_path(url) {
            let mut source =
                File::open(&path).map_err(|e| LuauBuildError::io("open", &path, e))?;
            io::copy(&mut source, &mut writer).map_err(|e| LuauBuildError::io("read", &path, e))?;
            return Ok(writer.finish());
        }

        let client = reqwest::blocking::Client::builder()
            .timeout(self.options.timeout)
            .connect_timeout(Duration::from_secs(10))
            .user_agent(format!("luaubuild/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| LuauBuildError::network_with_source(url, "failed to create HTTP client", e))?;

        let response = client
            .get(url)
            .send()
            .map_err(|e| LuauBuildError::network_with_source(url, "request failed", e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(LuauBuildError::network(url, format!("HTTP {}", status.as_u16())));
        }

        let pb = terminal::create_download_bar(response.content_length());
        pb.set_message("luau");
        let mut reader = pb.wrap_read(response);
        let copied = io::copy(&mut reader, &mut writer);
        pb.finish_and_clear();

        copied.map_err(|e| LuauBuildError::network_with_source(url, "download interrupted", e))?;
        Ok(writer.finish())
    }
}

/// `file://` URLs and bare paths are read from disk
fn local_path(url: &str) -> Option<PathBuf> {
    if let Some(path) = url.strip_prefix("file://") {
        return Some(PathBuf::from(path));
    }
    if url.starts_with("http://") || url.starts_with("https://") {
        return None;
    }
    Some(PathBuf::from(url))
}

/// Forwards writes while hashing them
struct HashingWriter<W> {
    inner: W,
    hasher: Sha256,
    bytes: u64,
}

impl<W: Write> HashingWriter<W> {
    fn new(inner: W) -> Self {
        Self {
            inner,
            hasher: Sha256::new(),
            bytes: 0,
        }
    }

    fn finish(self) -> (u64, String) {
        (self.bytes, format!("{:x}", self.hasher.finalize()))
    }
}

impl<W: Write> Write for HashingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.hasher.update(&buf[..n]);
        self.bytes += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Archive path with the top-level `prefix` folder removed
///
/// Returns `None` for the prefix folder itself. Entries outside the prefix
/// are kept as they are.
fn strip_archive_prefix(enclosed: &Path, prefix: &str) -> Option<PathBuf> {
    let relative = enclosed.strip_prefix(prefix).unwrap_or(enclosed);
    let relative: PathBuf = relative
        .components()
        .filter(|c| matches!(c, Component::Normal(_)))
        .collect();
    if relative.as_os_str().is_empty() {
        None
    } else {
        Some(relative)
    }
}

/// Extract every entry of the zip at `archive` under `dest`, stripping `prefix`
///
/// Entries are written in archive order; parents are created per file, so a
/// file listed before its directory entry still lands correctly. Existing
/// files are overwritten.
pub fn extract_archive(
    archive: &Path,
    dest: &Path,
    prefix: &str,
) -> Result<ExtractStats, LuauBuildError> {
    let file = File::open(archive).map_err(|e| LuauBuildError::io("open", archive, e))?;
    let mut zip = ZipArchive::new(file)
        .map_err(|e| LuauBuildError::archive_with_source(archive, "not a valid zip archive", e))?;

    let mut stats = ExtractStats::default();

    for i in 0..zip.len() {
        let mut entry = zip
            .by_index(i)
            .map_err(|e| LuauBuildError::archive_with_source(archive, "unreadable entry", e))?;

        // `enclosed_name` rejects absolute paths and `..` escapes
        let Some(relative) = entry
            .enclosed_name()
            .and_then(|p| strip_archive_prefix(&p, prefix))
        else {
            stats.skipped += 1;
            continue;
        };
        let out_path = dest.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&out_path)
                .map_err(|e| LuauBuildError::io("create directory", &out_path, e))?;
            stats.directories += 1;
            continue;
        }

        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| LuauBuildError::io("create directory", parent, e))?;
        }

        let mut out_file =
            File::create(&out_path).map_err(|e| LuauBuildError::io("create", &out_path, e))?;
        io::copy(&mut entry, &mut out_file).map_err(|e| {
            LuauBuildError::archive_with_source(
                archive,
                format!("failed to extract {}", entry.name()),
                e,
            )
        })?;

        #[cfg(unix)]
        if let Some(mode) = entry.unix_mode() {
            use std::os::unix::fs::PermissionsExt;
            // Keep owner-writable so a later `deps` can overwrite it
            let perms = fs::Permissions::from_mode((mode & 0o777) | 0o200);
            fs::set_permissions(&out_path, perms)
                .map_err(|e| LuauBuildError::io("set permissions on", &out_path, e))?;
        }

        stats.files += 1;
    }

    Ok(stats)
}

/// Print found/missing for each critical header; returns the missing ones
pub fn verify_headers(staging: &Path) -> Vec<String> {
    println!("\nVerifying critical files:");
    let mut missing = Vec::new();
    for header in CRITICAL_HEADERS {
        if staging.join(header).is_file() {
            println!("  ✓ Found: {}", header);
        } else {
            println!("  ❌ Missing: {}", header);
            missing.push(header.to_string());
        }
    }
    missing
}

fn list_include_dir(staging: &Path, relative: &str) {
    println!("\nContents of {}:", relative);
    match glob_files(&staging.join(relative), "*") {
        Ok(files) => {
            for file in files {
                println!("  {}", display_relative(&file, staging));
            }
        }
        Err(e) => terminal::print_warning(&e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use std::io::Read;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    /// Entries: (name, Some(contents)) for files, (name, None) for directories
    fn write_zip(path: &Path, entries: &[(&str, Option<&str>)]) {
        let file = File::create(path).unwrap();
        let mut zip = ZipWriter::new(file);
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
        for (name, contents) in entries {
            match contents {
                Some(body) => {
                    zip.start_file(*name, options).unwrap();
                    zip.write_all(body.as_bytes()).unwrap();
                }
                None => {
                    zip.add_directory(*name, options).unwrap();
                }
            }
        }
        zip.finish().unwrap();
    }

    fn manifest() -> Vec<(&'static str, Option<&'static str>)> {
        vec![
            ("luau-master/", None),
            ("luau-master/Ast/", None),
            ("luau-master/Ast/include/", None),
            ("luau-master/Ast/include/Luau/Ast.h", Some("#pragma once\n")),
            ("luau-master/Ast/src/Ast.cpp", Some("// ast\n")),
            ("luau-master/VM/src/lapi.cpp", Some("// vm\n")),
            ("luau-master/CMakeLists.txt", Some("project(Luau)\n")),
        ]
    }

    fn options_for(archive: &Path) -> FetchOptions {
        FetchOptions {
            url: format!("file://{}", archive.display()),
            ..FetchOptions::from(&SourceConfig::default())
        }
    }

    #[test]
    fn test_strip_archive_prefix() {
        assert_eq!(
            strip_archive_prefix(Path::new("luau-master/VM/src/lapi.cpp"), "luau-master"),
            Some(PathBuf::from("VM/src/lapi.cpp"))
        );
        assert_eq!(strip_archive_prefix(Path::new("luau-master"), "luau-master"), None);
        assert_eq!(
            strip_archive_prefix(Path::new("other/file.txt"), "luau-master"),
            Some(PathBuf::from("other/file.txt"))
        );
    }

    #[test]
    fn test_local_path() {
        assert_eq!(local_path("file:///tmp/a.zip"), Some(PathBuf::from("/tmp/a.zip")));
        assert_eq!(local_path("archive.zip"), Some(PathBuf::from("archive.zip")));
        assert_eq!(local_path("https://github.com/x.zip"), None);
    }

    #[test]
    fn test_extract_strips_prefix_and_creates_directories() {
        let temp = tempfile::tempdir().unwrap();
        let archive = temp.path().join("master.zip");
        write_zip(&archive, &manifest());
        let dest = temp.path().join("luau");

        let stats = extract_archive(&archive, &dest, "luau-master").unwrap();

        assert_eq!(stats.files, 4);
        assert_eq!(stats.directories, 2);
        assert_eq!(stats.skipped, 1);
        assert!(dest.join("Ast").is_dir());
        assert!(dest.join("Ast/include").is_dir());
        assert_eq!(
            fs::read_to_string(dest.join("Ast/include/Luau/Ast.h")).unwrap(),
            "#pragma once\n"
        );
        // File entry without a preceding directory entry
        assert!(dest.join("VM/src/lapi.cpp").is_file());
        assert!(!dest.join("luau-master").exists());
    }

    #[test]
    fn test_extract_large_entry_intact() {
        let temp = tempfile::tempdir().unwrap();
        let archive = temp.path().join("big.zip");
        let body: String = (0..50_000).map(|i| format!("{}\n", i % 97)).collect();
        write_zip(&archive, &[("luau-master/VM/src/big.cpp", Some(body.as_str()))]);
        let dest = temp.path().join("luau");

        extract_archive(&archive, &dest, "luau-master").unwrap();

        assert_eq!(fs::read_to_string(dest.join("VM/src/big.cpp")).unwrap(), body);
    }

    #[test]
    fn test_extract_overwrites_existing_files() {
        let temp = tempfile::tempdir().unwrap();
        let archive = temp.path().join("master.zip");
        write_zip(&archive, &manifest());
        let dest = temp.path().join("luau");
        fs::create_dir_all(dest.join("Ast/src")).unwrap();
        fs::write(dest.join("Ast/src/Ast.cpp"), "stale").unwrap();
        fs::write(dest.join("keep.txt"), "mine").unwrap();

        extract_archive(&archive, &dest, "luau-master").unwrap();

        assert_eq!(fs::read_to_string(dest.join("Ast/src/Ast.cpp")).unwrap(), "// ast\n");
        assert_eq!(fs::read_to_string(dest.join("keep.txt")).unwrap(), "mine");
    }

    #[test]
    fn test_extract_skips_escaping_entries() {
        let temp = tempfile::tempdir().unwrap();
        let archive = temp.path().join("evil.zip");
        write_zip(
            &archive,
            &[
                ("luau-master/../../escape.txt", Some("x")),
                ("luau-master/ok.txt", Some("ok")),
            ],
        );
        let dest = temp.path().join("stage");

        let stats = extract_archive(&archive, &dest, "luau-master").unwrap();

        assert_eq!(stats.files, 1);
        assert!(dest.join("ok.txt").is_file());
        assert!(!temp.path().join("escape.txt").exists());
    }

    #[test]
    fn test_extract_rejects_non_zip() {
        let temp = tempfile::tempdir().unwrap();
        let archive = temp.path().join("page.zip");
        fs::write(&archive, "<html>rate limited</html>").unwrap();

        let err = extract_archive(&archive, &temp.path().join("luau"), "luau-master").unwrap_err();
        assert!(matches!(err, LuauBuildError::Archive { .. }));
    }

    #[test]
    fn test_fetch_from_local_archive() {
        let temp = tempfile::tempdir().unwrap();
        let archive = temp.path().join("master.zip");
        write_zip(&archive, &manifest());
        let layout = Config::default().layout(temp.path());

        let report = Fetcher::new(&layout, options_for(&archive), true)
            .fetch()
            .unwrap();

        assert_eq!(report.extracted.files, 4);
        assert_eq!(report.bytes, fs::metadata(&archive).unwrap().len());
        assert_eq!(report.sha256.len(), 64);
        assert_eq!(report.missing_headers.len(), CRITICAL_HEADERS.len());
        assert!(layout.staging_dir.join("CMakeLists.txt").is_file());

        // Temporary download removed
        let leftovers = glob_files(&layout.staging_dir, "*.zip").unwrap();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_fetch_twice_is_fine() {
        let temp = tempfile::tempdir().unwrap();
        let archive = temp.path().join("master.zip");
        write_zip(&archive, &manifest());
        let layout = Config::default().layout(temp.path());
        let fetcher = Fetcher::new(&layout, options_for(&archive), false);

        fetcher.fetch().unwrap();
        let report = fetcher.fetch().unwrap();
        assert_eq!(report.extracted.files, 4);
    }

    #[test]
    fn test_fetch_non_zip_is_archive_error_without_library() {
        let temp = tempfile::tempdir().unwrap();
        let archive = temp.path().join("bogus.zip");
        fs::write(&archive, "404: Not Found").unwrap();
        let layout = Config::default().layout(temp.path());

        let err = Fetcher::new(&layout, options_for(&archive), false)
            .fetch()
            .unwrap_err();

        assert!(matches!(err, LuauBuildError::Archive { .. }));
        assert!(!layout.library.exists());
        assert!(glob_files(&layout.staging_dir, "*.zip").unwrap().is_empty());
    }

    /// Answer a single HTTP request with `status` and `body`; returns the URL to fetch
    fn serve_once(status: &'static str, body: Vec<u8>) -> String {
        use std::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = stream.read(&mut buf).unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            let head = format!(
                "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                status,
                body.len()
            );
            stream.write_all(head.as_bytes()).unwrap();
            stream.write_all(&body).unwrap();
        });
        format!("http://{}/luau/master.zip", addr)
    }

    fn http_options(url: String) -> FetchOptions {
        FetchOptions {
            url,
            timeout: Duration::from_secs(10),
            ..FetchOptions::from(&SourceConfig::default())
        }
    }

    #[test]
    fn test_fetch_connection_refused_is_network_error() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let temp = tempfile::tempdir().unwrap();
        let layout = Config::default().layout(temp.path());
        let options = http_options(format!("http://127.0.0.1:{}/master.zip", port));

        let err = Fetcher::new(&layout, options, false).fetch().unwrap_err();

        assert!(matches!(err, LuauBuildError::Network { .. }));
        assert!(glob_files(&layout.staging_dir, "*.zip").unwrap().is_empty());
    }

    #[test]
    fn test_fetch_http_404_is_network_error() {
        let url = serve_once("404 Not Found", b"Not Found".to_vec());
        let temp = tempfile::tempdir().unwrap();
        let layout = Config::default().layout(temp.path());

        let err = Fetcher::new(&layout, http_options(url), false)
            .fetch()
            .unwrap_err();

        match err {
            LuauBuildError::Network { message, .. } => assert_eq!(message, "HTTP 404"),
            other => panic!("expected network error, got {other:?}"),
        }
        assert!(!layout.staging_dir.join("Ast").exists());
    }

    #[test]
    fn test_fetch_over_http() {
        let temp = tempfile::tempdir().unwrap();
        let archive = temp.path().join("master.zip");
        write_zip(&archive, &manifest());
        let url = serve_once("200 OK", fs::read(&archive).unwrap());
        let layout = Config::default().layout(temp.path());

        let report = Fetcher::new(&layout, http_options(url), false)
            .fetch()
            .unwrap();

        assert_eq!(report.extracted.files, 4);
        assert!(layout.staging_dir.join("VM/src/lapi.cpp").is_file());
    }

    #[test]
    fn test_fetch_checksum_mismatch() {
        let temp = tempfile::tempdir().unwrap();
        let archive = temp.path().join("master.zip");
        write_zip(&archive, &manifest());
        let layout = Config::default().layout(temp.path());
        let options = FetchOptions {
            sha256: Some("00".repeat(32)),
            ..options_for(&archive)
        };

        let err = Fetcher::new(&layout, options, false).fetch().unwrap_err();
        match err {
            LuauBuildError::Archive { message, .. } => assert!(message.contains("SHA-256 mismatch")),
            other => panic!("unexpected error: {other}"),
        }
        assert!(!layout.staging_dir.join("Ast").exists());
    }

    #[test]
    fn test_fetch_checksum_match() {
        let temp = tempfile::tempdir().unwrap();
        let archive = temp.path().join("master.zip");
        write_zip(&archive, &manifest());
        let expected = format!("{:x}", Sha256::digest(fs::read(&archive).unwrap()));
        let layout = Config::default().layout(temp.path());
        let options = FetchOptions {
            sha256: Some(expected.to_uppercase()),
            ..options_for(&archive)
        };

        let report = Fetcher::new(&layout, options, false).fetch().unwrap();
        assert_eq!(report.sha256, expected);
    }

    #[test]
    fn test_fetch_missing_local_archive_is_io_error() {
        let temp = tempfile::tempdir().unwrap();
        let layout = Config::default().layout(temp.path());

        let err = Fetcher::new(&layout, options_for(&temp.path().join("nope.zip")), false)
            .fetch()
            .unwrap_err();
        assert!(matches!(err, LuauBuildError::Io { .. }));
    }

    #[test]
    fn test_verify_headers_reports_missing() {
        let temp = tempfile::tempdir().unwrap();
        let header = temp.path().join(CRITICAL_HEADERS[0]);
        fs::create_dir_all(header.parent().unwrap()).unwrap();
        fs::write(&header, "").unwrap();

        let missing = verify_headers(temp.path());
        assert_eq!(missing.len(), CRITICAL_HEADERS.len() - 1);
        assert!(!missing.contains(&CRITICAL_HEADERS[0].to_string()));
    }
}
