//! Statistical summaries for training-log analysis.
//!
//! This crate provides the small set of descriptive statistics the training
//! tools need when summarizing logged episodes: per-episode returns, maximum
//! progress values, and epoch loss curves.
//!
//! # Examples
//!
//! ```
//! use helmsman_stats::descriptive::DescriptiveStats;
//!
//! let returns = [1.0, 2.0, 3.0, 4.0, 5.0];
//! let stats = DescriptiveStats::new(returns).unwrap();
//! assert_eq!(stats.mean, 3.0);
//! assert_eq!(stats.median, 3.0);
//! ```

pub mod descriptive;
