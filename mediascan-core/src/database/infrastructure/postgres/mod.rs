mod watched_roots;

pub use watched_roots::PostgresWatchedRootStore;
