use std::{
    fs::{self, File},
    io,
    path::Path,
    str::FromStr,
    sync::{mpsc, Arc, LazyLock, Mutex, PoisonError},
    thread,
};

use anyhow::Result;
use file_rotate::{
    compression::Compression,
    suffix::{AppendTimestamp, FileLimit},
    {ContentLimit, FileRotate},
};
use log::Log;
use simplelog::{ConfigBuilder, LevelFilter, WriteLogger};

pub type LogSink = Arc<dyn Fn(String) + Send + Sync>;

/// Sink registered by the host UI, it receives every formatted log line.
static HOST_LOGGER: LazyLock<Mutex<Option<LogSink>>> = LazyLock::new(|| Mutex::new(None));

/// Sender side of the dispatcher channel, `None` until `init` runs.
static LOG_SENDER: LazyLock<Mutex<Option<mpsc::Sender<String>>>> =
    LazyLock::new(|| Mutex::new(None));

pub struct MainLogger {
    level: LevelFilter,
    write_logger: Box<WriteLogger<FileRotate<AppendTimestamp>>>,
}

impl MainLogger {
    fn new(
        level: LevelFilter,
        write_logger: Box<WriteLogger<FileRotate<AppendTimestamp>>>,
    ) -> Self {
        Self {
            level,
            write_logger,
        }
    }
}

impl Log for MainLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        self.write_logger.log(record);

        let message = format!(
            "{}:{} -- {}",
            record.level(),
            record.target(),
            record.args()
        );

        let sender = LOG_SENDER.lock().unwrap_or_else(PoisonError::into_inner);
        match sender.as_ref() {
            // a closed channel only means nobody is listening anymore
            Some(tx) => {
                let _ = tx.send(message);
            }
            None => eprintln!("{message}"),
        }
    }

    fn flush(&self) {
        self.write_logger.flush();
    }
}

pub fn parse_level(level: &str) -> Result<LevelFilter> {
    LevelFilter::from_str(level).map_err(|_| anyhow!("unknown log level: {}", level))
}

pub fn init(cache_dir: &str, level: &str) -> Result<()> {
    let level = parse_level(level)?;
    let path = Path::new(cache_dir).join("logs/main.log");
    let log = FileRotate::new(
        path,
        AppendTimestamp::default(FileLimit::MaxFiles(3)),
        ContentLimit::Lines(1000),
        Compression::None,
        #[cfg(unix)]
        None,
    );
    let config = ConfigBuilder::new().set_time_format_rfc3339().build();
    let write_logger = WriteLogger::new(level, config, log);
    let main_logger = MainLogger::new(level, write_logger);
    log::set_boxed_logger(Box::new(main_logger))?;
    log::set_max_level(level);

    init_dispatcher();

    Ok(())
}

/// One thread forwards log lines to the host sink, so a slow host never
/// blocks the thread that logged.
fn init_dispatcher() {
    let mut guard = LOG_SENDER.lock().unwrap_or_else(PoisonError::into_inner);
    if guard.is_some() {
        return;
    }

    let (tx, rx) = mpsc::channel::<String>();
    *guard = Some(tx);

    thread::spawn(move || {
        while let Ok(msg) = rx.recv() {
            let sink = HOST_LOGGER
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone();
            match sink {
                Some(sink) => sink(msg),
                None => eprintln!("{msg}"),
            }
        }
    });
}

pub fn set_host_sink(sink: impl Fn(String) + Send + Sync + 'static) {
    let mut guard = HOST_LOGGER.lock().unwrap_or_else(PoisonError::into_inner);
    *guard = Some(Arc::new(sink));
}

pub fn export(cache_dir: &str, target_file_path: &str) -> Result<()> {
    log::logger().flush();
    let mut zip = zip::ZipWriter::new(File::create(target_file_path)?);
    let default_options =
        zip::write::SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);

    let log_folder = Path::new(cache_dir).join("logs/");
    for entry in (fs::read_dir(&log_folder)?).flatten() {
        let path = entry.path();
        if path.is_file() {
            if let Some(name) = path.strip_prefix(cache_dir)?.to_str() {
                zip.start_file(name, default_options)?;
                let mut log_file = File::open(&path)?;
                io::copy(&mut log_file, &mut zip)?;
            }
        }
    }

    zip.finish()?;
    Ok(())
}
