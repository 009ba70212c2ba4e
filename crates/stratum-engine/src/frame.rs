//! Frame loop that steps engines over one entity database.
//!
//! Each [`FrameLoop::frame`]:
//!
//! 1. Steps every registered engine in registration order, each receiving
//!    exclusive access to the [`EntityDatabase`].
//! 2. Stops at the first engine that fails; later engines do not run and the
//!    frame counter does not advance.
//! 3. Records per-engine wall-clock time in [`FrameDiagnostics`].
//!
//! When frames run is up to the caller.
//!
//! # Example
//!
//! ```
//! use stratum_engine::frame::FrameLoop;
//! use stratum_engine::engines::TransformEngine;
//! use stratum_ecs::EntityDatabase;
//!
//! let mut frames = FrameLoop::new(EntityDatabase::new());
//! frames.add_engine(TransformEngine::new());
//!
//! for _ in 0..10 {
//!     frames.frame().unwrap();
//! }
//!
//! assert_eq!(frames.frame_count(), 10);
//! assert_eq!(frames.engine_names(), vec!["transform"]);
//! ```

use std::time::{Duration, Instant};

use stratum_ecs::EntityDatabase;

use crate::engines::{AnyEngine, Engine};
use crate::EngineError;

// ---------------------------------------------------------------------------
// FrameDiagnostics
// ---------------------------------------------------------------------------

/// Timing diagnostics for the last frame.
#[derive(Debug, Clone, Default)]
pub struct FrameDiagnostics {
    /// Wall-clock time per engine that ran, in order of execution.
    pub engine_times: Vec<(String, Duration)>,
    /// Total time for the frame.
    pub total_time: Duration,
}

// ---------------------------------------------------------------------------
// FrameLoop
// ---------------------------------------------------------------------------

/// Owns the database and the ordered engine list.
pub struct FrameLoop {
    database: EntityDatabase,
    engines: Vec<Box<dyn AnyEngine>>,
    /// Frames completed without error.
    frame_counter: u64,
    last_diagnostics: FrameDiagnostics,
}

impl FrameLoop {
    pub fn new(database: EntityDatabase) -> Self {
        Self {
            database,
            engines: Vec::new(),
            frame_counter: 0,
            last_diagnostics: FrameDiagnostics::default(),
        }
    }

    /// Register an engine. Engines step in the order they are added.
    ///
    /// # Panics
    ///
    /// Panics if an engine with the same name is already registered.
    pub fn add_engine<E: Engine>(&mut self, engine: E) {
        let name = engine.name().to_owned();
        assert!(
            !self.engines.iter().any(|e| e.name() == name),
            "duplicate engine name: {name:?}"
        );
        tracing::debug!(engine = %name, position = self.engines.len(), "engine registered");
        self.engines.push(Box::new(engine));
    }

    /// Step every engine once.
    ///
    /// On failure the error is wrapped in [`EngineError::EngineFailed`] naming
    /// the engine; the diagnostics then cover the engines that ran.
    pub fn frame(&mut self) -> Result<(), EngineError> {
        let frame_start = Instant::now();
        let mut engine_times = Vec::with_capacity(self.engines.len());
        let frame = self.frame_counter + 1;

        let mut outcome = Ok(());
        for engine in &mut self.engines {
            let step_start = Instant::now();
            let result = engine.step(&mut self.database);
            engine_times.push((engine.name().to_owned(), step_start.elapsed()));

            if let Err(source) = result {
                tracing::error!(engine = engine.name(), frame, error = %source, "engine step failed");
                outcome = Err(EngineError::EngineFailed {
                    engine: engine.name().to_owned(),
                    frame,
                    source: Box::new(source),
                });
                break;
            }
        }

        self.last_diagnostics = FrameDiagnostics {
            engine_times,
            total_time: frame_start.elapsed(),
        };
        outcome?;

        self.frame_counter = frame;
        tracing::debug!(
            frame,
            total_us = self.last_diagnostics.total_time.as_micros() as u64,
            "frame complete"
        );
        Ok(())
    }

    /// Run `count` frames, stopping at the first failure.
    pub fn run_frames(&mut self, count: u64) -> Result<(), EngineError> {
        tracing::info!(
            frames = count,
            engines = self.engines.len(),
            start = self.frame_counter,
            "running frames"
        );
        for _ in 0..count {
            self.frame()?;
        }
        let stats = self.database.stats();
        tracing::info!(
            frames = self.frame_counter,
            entities = stats.issued_entities,
            implementers = stats.implementers,
            views = stats.views,
            "frames finished"
        );
        Ok(())
    }

    // -- accessors ----------------------------------------------------------

    /// Frames completed without error.
    pub fn frame_count(&self) -> u64 {
        self.frame_counter
    }

    pub fn engine_count(&self) -> usize {
        self.engines.len()
    }

    /// Engine names in execution order.
    pub fn engine_names(&self) -> Vec<&str> {
        self.engines.iter().map(|e| e.name()).collect()
    }

    /// The first registered engine of type `E`.
    pub fn engine<E: Engine>(&self) -> Option<&E> {
        self.engines
            .iter()
            .find_map(|e| e.as_any().downcast_ref::<E>())
    }

    pub fn engine_mut<E: Engine>(&mut self) -> Option<&mut E> {
        self.engines
            .iter_mut()
            .find_map(|e| e.as_any_mut().downcast_mut::<E>())
    }

    pub fn last_diagnostics(&self) -> &FrameDiagnostics {
        &self.last_diagnostics
    }

    pub fn database(&self) -> &EntityDatabase {
        &self.database
    }

    /// Direct database access, for setup outside any engine.
    pub fn database_mut(&mut self) -> &mut EntityDatabase {
        &mut self.database
    }

    /// Drop every engine and hand back the database.
    pub fn into_database(mut self) -> EntityDatabase {
        self.engines.clear();
        std::mem::take(&mut self.database)
    }
}

impl Drop for FrameLoop {
    fn drop(&mut self) {
        tracing::info!(frames = self.frame_counter, "frame loop shut down");
    }
}

impl std::fmt::Debug for FrameLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameLoop")
            .field("engines", &self.engine_names())
            .field("frame_counter", &self.frame_counter)
            .field("database", &self.database)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
