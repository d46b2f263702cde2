use anyhow::{Result, anyhow};
use async_trait::async_trait;
use ew_api_types::WalletAddress;
use ew_chain_client::{
    CallRequest, ChainAdapter, SubmitTxRequest, SubmitTxResult, TxStatus, TxStatusRequest,
    TxStatusResult,
};
use ew_storage::WalletStorage;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub(crate) struct UnavailableStorage;

#[async_trait]
impl WalletStorage for UnavailableStorage {
    async fn load_record(&self, _key: &str) -> Result<Option<Vec<u8>>> {
        Err(anyhow!("storage disabled"))
    }

    async fn save_record(&self, _key: &str, _value: Vec<u8>) -> Result<()> {
        Err(anyhow!("storage disabled"))
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum SubmitScript {
    Accept,
    Reject(&'static str),
    TransportError,
}

struct ChainState {
    balance: u128,
    offline: bool,
    balance_reads_left: Option<usize>,
    submit: SubmitScript,
    submit_delay: Duration,
    balance_delay: Duration,
    receipts: VecDeque<TxStatus>,
    submitted: Vec<SubmitTxRequest>,
    calls: usize,
    nonce: u64,
}

/// In-process chain whose answers are set up by each test. Accepted
/// transfers debit the scripted balance.
#[derive(Clone)]
pub(crate) struct ScriptedChain {
    state: Arc<Mutex<ChainState>>,
}

impl ScriptedChain {
    pub(crate) fn with_balance(balance: u128) -> Self {
        Self {
            state: Arc::new(Mutex::new(ChainState {
                balance,
                offline: false,
                balance_reads_left: None,
                submit: SubmitScript::Accept,
                submit_delay: Duration::ZERO,
                balance_delay: Duration::ZERO,
                receipts: VecDeque::from([TxStatus::Confirmed { block_number: 1 }]),
                submitted: Vec::new(),
                calls: 0,
                nonce: 0,
            })),
        }
    }

    pub(crate) fn offline() -> Self {
        let chain = Self::with_balance(0);
        chain.state.lock().unwrap().offline = true;
        chain
    }

    pub(crate) fn submit(self, script: SubmitScript) -> Self {
        self.state.lock().unwrap().submit = script;
        self
    }

    pub(crate) fn submit_delay(self, delay: Duration) -> Self {
        self.state.lock().unwrap().submit_delay = delay;
        self
    }

    pub(crate) fn balance_delay(self, delay: Duration) -> Self {
        self.state.lock().unwrap().balance_delay = delay;
        self
    }

    pub(crate) fn receipts(self, receipts: Vec<TxStatus>) -> Self {
        self.state.lock().unwrap().receipts = receipts.into();
        self
    }

    /// Lets `reads` more balance queries succeed, then fails the rest.
    pub(crate) fn fail_balance_after(&self, reads: usize) {
        self.state.lock().unwrap().balance_reads_left = Some(reads);
    }

    pub(crate) fn submitted(&self) -> Vec<SubmitTxRequest> {
        self.state.lock().unwrap().submitted.clone()
    }

    pub(crate) fn call_count(&self) -> usize {
        self.state.lock().unwrap().calls
    }

    fn enter(&self) -> Result<std::sync::MutexGuard<'_, ChainState>> {
        let mut state = self.state.lock().unwrap();
        state.calls += 1;
        if state.offline {
            return Err(anyhow!("connection refused"));
        }
        Ok(state)
    }
}

#[async_trait]
impl ChainAdapter for ScriptedChain {
    async fn get_balance(&self, _wallet_address: &WalletAddress) -> Result<u128> {
        let delay = self.state.lock().unwrap().balance_delay;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.enter()?;
        if let Some(left) = state.balance_reads_left.as_mut() {
            if *left == 0 {
                return Err(anyhow!("request timed out"));
            }
            *left -= 1;
        }
        Ok(state.balance)
    }

    async fn get_transaction_count(&self, _wallet_address: &WalletAddress) -> Result<u64> {
        Ok(self.enter()?.nonce)
    }

    async fn gas_price(&self) -> Result<u128> {
        self.enter()?;
        Ok(1_000_000_000)
    }

    async fn submit_transaction(&self, req: SubmitTxRequest) -> Result<SubmitTxResult> {
        let (script, delay) = {
            let state = self.enter()?;
            (state.submit, state.submit_delay)
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        match script {
            SubmitScript::TransportError => Err(anyhow!("connection reset")),
            SubmitScript::Reject(reason) => Ok(SubmitTxResult {
                tx_hash: req.tx_hash,
                accepted: false,
                rejection_reason: Some(reason.to_owned()),
            }),
            SubmitScript::Accept => {
                let mut state = self.state.lock().unwrap();
                state.balance = state.balance.saturating_sub(req.value);
                state.nonce += 1;
                let tx_hash = req.tx_hash.clone();
                state.submitted.push(req);
                Ok(SubmitTxResult {
                    tx_hash,
                    accepted: true,
                    rejection_reason: None,
                })
            }
        }
    }

    async fn get_transaction_status(&self, req: TxStatusRequest) -> Result<TxStatusResult> {
        let mut state = self.enter()?;
        let status = if state.receipts.len() > 1 {
            state.receipts.pop_front()
        } else {
            state.receipts.front().copied()
        }
        .unwrap_or(TxStatus::Pending);

        Ok(TxStatusResult {
            tx_hash: req.tx_hash,
            status,
        })
    }

    async fn call(&self, _req: CallRequest) -> Result<Vec<u8>> {
        self.enter()?;
        Ok(vec![0_u8; 32])
    }
}
