//! Stampede-protected cache-aside.
//!
//! [`StampedeCache`] serves fresh entries straight from the
//! [`KeyValueStore`](crate::store::KeyValueStore) and arranges that exactly
//! one caller recomputes a missing or stale entry at a time:
//!
//! ```text
//! fresh entry ───────────────────────────────► Hit
//! stale / missing ─► try_claim ─ won ─► compute ─► Value  ─► store, Computed
//!                        │                      ├► NoData ─► nothing stored
//!                        │                      └► Failed ─► nothing stored, Err
//!                        └─ lost ─► stale entry? ─ yes ─► Stale
//!                                                └ no ──► winner's result (same process)
//!                                                         or poll (bounded), retry
//! ```
//!
//! # Entry lifetime
//!
//! An entry is written with a store TTL of `ttl + stale_grace`. It is fresh
//! while younger than `ttl`, and servable as stale to claim losers for the
//! `stale_grace` after that. Failures are never cached.
//!
//! # Claims
//!
//! A claim is a short-lived marker under `{key}#claim` created with the
//! store's atomic [`try_claim`](crate::store::KeyValueStore::try_claim). The
//! winner's computation runs on a spawned task that releases the claim on
//! success and on failure alike, so a caller that gives up (or is dropped)
//! never strands the claim or cancels the computation. A computation that
//! panics leaves the claim to expire after `claim_ttl`.
//!
//! Losers in the winner's process wait on the winner's published result
//! and return it, error included, so one failing computation answers every
//! caller that was waiting on it. Losers in other processes cannot see that
//! result; once the claim is released they read the stored entry or claim
//! in turn.
//!
//! `claim_ttl` must exceed the longest computation, otherwise the claim can
//! expire under a running winner.

mod entry;
mod stampede;

pub use entry::CacheEntry;
pub use stampede::{CacheConfig, ComputeOutcome, Lookup, StampedeCache, claim_key};
pub(crate) use stampede::CLAIM_SUFFIX;
