use tracing::warn;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Threads {
    Single,
    Auto,
    Multi(usize),
}

impl Threads {
    pub fn number_of_threads(&self) -> usize {
        match self {
            Threads::Single => 1,
            Threads::Multi(num) => (*num).max(1),
            Threads::Auto => std::thread::available_parallelism().map_or(1, |n| n.get()),
        }
    }

    pub fn build_pool(&self) -> Result<rayon::ThreadPool, rayon::ThreadPoolBuildError> {
        rayon::ThreadPoolBuilder::new()
            .num_threads(self.number_of_threads())
            .build()
    }

    /// Runs `op` inside a dedicated pool, or inside the global pool when
    /// the dedicated one cannot be created.
    pub fn install<OP, R>(&self, op: OP) -> R
    where
        OP: FnOnce() -> R + Send,
        R: Send,
    {
        match self.build_pool() {
            Ok(pool) => pool.install(op),
            Err(err) => {
                warn!("Falling back to the global thread pool: {}", err);
                op()
            }
        }
    }
}

impl Default for Threads {
    fn default() -> Self {
        Threads::Multi(4)
    }
}
