//! # Media Compressor Library
//!
//! Questo è il modulo principale della libreria che espone tutte le API pubbliche.
//!
//! ## Responsabilità:
//! - Definisce la struttura modulare dell'applicazione
//! - Espone i tipi e le funzioni principali tramite re-exports
//! - Fornisce un'interfaccia pulita per il main.rs e per altri consumatori
//!
//! ## Architettura dei moduli:
//! - `config`: Configurazione del batch e validazione parametri
//! - `error`: Tipi di errore custom
//! - `file_manager`: Classificazione file e discovery media
//! - `image_processor`: Decisione lossless / lossy / skip per le immagini
//! - `resize`: Pianificazione del ridimensionamento
//! - `metadata`: Estrazione e inserimento EXIF
//! - `video_processor`: Transcodifica video con ffmpeg
//! - `outcome`: Job e risultati per file
//! - `optimizer`: Dispatcher, worker e aggregatore del batch
//! - `progress`: Totali del batch e progress bar
//! - `json_output`: Eventi JSON per consumatori programmatici
//!
//! ## Utilizzo:
//! ```rust,ignore
//! use media_compressor::{start_batch, Config};
//!
//! let mut handle = start_batch(Config::new("/photos")).await?;
//! while let Some(outcome) = handle.next_outcome().await {
//!     println!("{} {}", outcome.status.label(), outcome.message);
//! }
//! let progress = handle.wait().await?;
//! println!("{}", progress.format_summary());
//! ```

pub mod config;
pub mod error;
pub mod file_manager;
pub mod image_processor;
pub mod json_output;
pub mod metadata;
pub mod optimizer;
pub mod outcome;
pub mod platform;
pub mod progress;
pub mod resize;
pub mod utils;
pub mod video_processor;

pub use config::Config;
pub use error::CompressError;
pub use file_manager::{FileManager, MediaKind};
pub use optimizer::{start_batch, BatchHandle, MediaCompressor};
pub use outcome::{Job, Outcome, OutcomeStatus};
pub use progress::BatchProgress;
