#![allow(dead_code)]

pub mod catalog_stub;

use async_trait::async_trait;
use spotq::prelude::*;
use std::sync::Mutex;
use std::time::Duration;

/// Executor that records every job it runs and fails the ones whose
/// reference contains "fail".
#[derive(Default)]
pub struct RecordingExecutor {
    jobs: Mutex<Vec<Job>>,
}

impl RecordingExecutor {
    pub fn jobs(&self) -> Vec<Job> {
        self.jobs.lock().unwrap().clone()
    }

    /// Poll until at least `n` jobs have run.
    pub async fn wait_for(&self, n: usize) -> Vec<Job> {
        for _ in 0..400 {
            let jobs = self.jobs();
            if jobs.len() >= n {
                return jobs;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("expected {n} jobs, saw {:?}", self.jobs());
    }
}

#[async_trait]
impl JobExecutor for RecordingExecutor {
    async fn execute(&self, job: &Job) -> Result<ExecutorOutput, ExecutorError> {
        self.jobs.lock().unwrap().push(job.clone());
        tokio::time::sleep(Duration::from_millis(2)).await;
        if job.source_reference.contains("fail") {
            return Err(ExecutorError::Failed {
                code: Some(1),
                stderr: "track unavailable".into(),
            });
        }
        Ok(ExecutorOutput {
            stdout: format!("Downloaded \"{}\"", job.display_name),
            stderr: String::new(),
        })
    }
}
