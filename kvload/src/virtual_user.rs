use crate::issuer::Issuer;
use crate::selector::WeightTable;
use crate::sink::ObservationSink;
use crate::workload::Request;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{sleep_until, Instant};
#[allow(unused)]
use tracing::{debug, error, info, trace, warn};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum State {
    Running,
    Sleeping,
    Stopped,
}

/// Seed for virtual user `vu` of scenario `scenario`, derived from the run seed.
pub(crate) fn vu_seed(run_seed: u64, scenario: usize, vu: usize) -> u64 {
    run_seed ^ (((scenario as u64) << 32) | (vu as u64 & 0xFFFF_FFFF))
}

/// One simulated client: issue a request, record it, pause, repeat until the deadline.
pub(crate) struct VirtualUser<I> {
    id: usize,
    issuer: Arc<I>,
    table: Arc<WeightTable>,
    key_space: u32,
    pause: Duration,
    deadline: Instant,
    rng: SmallRng,
    sink: ObservationSink,
    stop: watch::Receiver<bool>,
    state: State,
    iterations: u64,
}

impl<I> VirtualUser<I>
where
    I: Issuer + Send + Sync + 'static,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: usize,
        issuer: Arc<I>,
        table: Arc<WeightTable>,
        key_space: u32,
        pause: Duration,
        deadline: Instant,
        seed: u64,
        sink: ObservationSink,
        stop: watch::Receiver<bool>,
    ) -> Self {
        Self {
            id,
            issuer,
            table,
            key_space,
            pause,
            deadline,
            rng: SmallRng::seed_from_u64(seed),
            sink,
            stop,
            state: State::Running,
            iterations: 0,
        }
    }

    /// Runs until stopped, returning the number of completed iterations.
    pub async fn run(mut self) -> u64 {
        loop {
            self.state = match self.state {
                State::Running => self.iterate().await,
                State::Sleeping => self.sleep().await,
                State::Stopped => break,
            };
        }
        trace!("VU {} stopped after {} iterations", self.id, self.iterations);
        self.iterations
    }

    fn should_stop(&self) -> bool {
        Instant::now() >= self.deadline || *self.stop.borrow()
    }

    async fn iterate(&mut self) -> State {
        // NOTE: This is the only point at which a request may be started; an in-flight request
        // always completes and is recorded.
        if self.should_stop() {
            return State::Stopped;
        }

        let request = Request::generate(&self.table, self.key_space, &mut self.rng);
        let observation = self.issuer.issue(&request).await;
        self.sink.record(observation);
        self.iterations += 1;

        State::Sleeping
    }

    async fn sleep(&mut self) -> State {
        let wake = Instant::now()
            .checked_add(self.pause)
            .map_or(self.deadline, |wake| wake.min(self.deadline));
        tokio::select! {
            _ = sleep_until(wake) => {}
            _ = stopped(&mut self.stop) => {}
        }

        if self.should_stop() {
            State::Stopped
        } else {
            State::Running
        }
    }
}

/// Resolves once the stop flag is raised. Never resolves if the sender is gone.
async fn stopped(stop: &mut watch::Receiver<bool>) {
    let closed = stop.wait_for(|stop| *stop).await.is_err();
    if closed {
        std::future::pending::<()>().await;
    }
}
