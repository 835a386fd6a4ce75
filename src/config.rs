use crate::error::{Error, Result};

/// Hard ceiling on the worker limit a pool may be created with.
pub const MAX_WORKERS: usize = 1024;

/// Hard ceiling on the task capacity a pool may be created with.
pub const MAX_TASKS: usize = 1 << 20;

#[derive(Debug, Clone)]
pub struct Config {
    /// Upper bound on spawned workers. `None` means one per logical CPU.
    pub max_workers: Option<usize>,
    /// Upper bound on admitted tasks (pending + running + awaiting reclaim).
    pub max_tasks: usize,
    pub thread_name_prefix: String,
    pub stack_size: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_workers: None,
            max_tasks: 4096,
            thread_name_prefix: "tidepool-worker".to_string(),
            stack_size: Some(2 * 1024 * 1024),
        }
    }
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(n) = self.max_workers {
            if n == 0 {
                return Err(Error::config("max_workers must be > 0"));
            }
            if n > MAX_WORKERS {
                return Err(Error::config(format!(
                    "max_workers too large (max {})",
                    MAX_WORKERS
                )));
            }
        }

        if self.max_tasks == 0 {
            return Err(Error::config("max_tasks must be > 0"));
        }
        if self.max_tasks > MAX_TASKS {
            return Err(Error::config(format!(
                "max_tasks too large (max {})",
                MAX_TASKS
            )));
        }

        Ok(())
    }

    /// Resolved worker ceiling for this configuration.
    pub fn worker_limit(&self) -> usize {
        self.max_workers.unwrap_or_else(num_cpus::get)
    }
}

#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn max_workers(mut self, n: usize) -> Self {
        self.config.max_workers = Some(n);
        self
    }

    pub fn max_tasks(mut self, n: usize) -> Self {
        self.config.max_tasks = n;
        self
    }

    pub fn thread_name_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.config.thread_name_prefix = prefix.into();
        self
    }

    pub fn stack_size(mut self, size: usize) -> Self {
        self.config.stack_size = Some(size);
        self
    }

    pub fn build(self) -> Result<Config> {
        self.config.validate()?;
        Ok(self.config)
    }
}
