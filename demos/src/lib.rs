//! Runnable demonstrations of the modeling/solving core: one `Problem`
//! builder per showcased construct (precedence, alternative job orderings,
//! optional tasks, buffers, weighted multi-objective, cumulative capacity).

pub mod scenarios;
