use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Arc, Mutex, OnceLock};

/// Mirrors every log line to stderr and, once attached, to a log file.
#[derive(Clone, Default)]
struct Tee {
    file: Arc<Mutex<Option<std::fs::File>>>,
}

struct TeeWriter {
    file: Arc<Mutex<Option<std::fs::File>>>,
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for Tee {
    type Writer = TeeWriter;

    fn make_writer(&'a self) -> Self::Writer {
        TeeWriter {
            file: self.file.clone(),
        }
    }
}

impl Write for TeeWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let written = io::stderr().write(buf)?;
        if let Some(file) = self.file.lock().unwrap().as_mut() {
            let _ = file.write_all(buf);
        }
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().flush()?;
        if let Some(file) = self.file.lock().unwrap().as_mut() {
            let _ = file.flush();
        }
        Ok(())
    }
}

static TEE: OnceLock<Tee> = OnceLock::new();

/// Install the subscriber. Called once at startup, before CLI parsing, so
/// even argument errors are logged; the log file is attached afterwards via
/// [`attach_log_file`].
pub fn init() {
    let _ = tracing_log::LogTracer::init();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let tee = Tee::default();
    let _ = TEE.set(tee.clone());

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(tee)
        .try_init();
}

pub fn attach_log_file(path: Option<&Path>) {
    let Some(tee) = TEE.get() else {
        return;
    };
    let mut guard = tee.file.lock().unwrap();
    match path {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                let _ = std::fs::create_dir_all(parent);
            }
            if let Ok(file) = OpenOptions::new().create(true).append(true).open(path) {
                *guard = Some(file);
            }
        }
        None => *guard = None,
    }
}
