//! Session coordination across worker threads.
//!
//! - [`Trainer`]: Shared front door; builds environments and runs episodes
//! - [`ShutdownCoordinator`]: Exactly-once stop when the step budget runs out
//!
//! # Example
//!
//! ```rust,ignore
//! let trainer = Arc::new(Trainer::new(config, factory)?);
//! trainer.add_preprocessor("time_limit", time_limit(500))?;
//!
//! thread::scope(|s| {
//!     for _ in 0..workers {
//!         let trainer = &trainer;
//!         s.spawn(move || -> Result<()> {
//!             let env = trainer.build_environment()?;
//!             let mut agent = MyAgent::new();
//!             while !trainer.run_episode(&mut agent, &env)?.should_stop() {}
//!             Ok(())
//!         });
//!     }
//! });
//! ```

pub mod shutdown;
pub mod trainer;


pub use shutdown::{CloseReport, ShutdownCoordinator, ShutdownPlan};
pub use trainer::Trainer;
