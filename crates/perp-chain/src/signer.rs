//! Deployer key selection.

use std::str::FromStr;

use ethers::signers::coins_bip39::English;
use ethers::signers::{LocalWallet, MnemonicBuilder, Signer};

use crate::error::{Result, SetupError};

/// Development mnemonic used when nothing else is configured.
pub const DEFAULT_MNEMONIC: &str =
    "explain tackle mirror kit van hammer degree position ginger unfair soup bonus";

/// Where the deployer key comes from. Resolved once at startup.
#[derive(Clone, PartialEq, Eq)]
pub enum SignerSource {
    PrivateKey(String),
    /// BIP-39 phrase, account `index` under `m/44'/60'/0'/0/`.
    Mnemonic { phrase: String, index: u32 },
}

impl std::fmt::Debug for SignerSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SignerSource::PrivateKey(_) => f.write_str("PrivateKey(<redacted>)"),
            SignerSource::Mnemonic { index, .. } => f
                .debug_struct("Mnemonic")
                .field("phrase", &"<redacted>")
                .field("index", index)
                .finish(),
        }
    }
}

impl SignerSource {
    /// First configured source wins: private key, mnemonic from the
    /// environment, mnemonic from the parameters file, then the default.
    pub fn select(
        private_key: Option<String>,
        env_mnemonic: Option<String>,
        parameters_mnemonic: Option<&str>,
    ) -> Self {
        if let Some(key) = private_key.filter(|k| !k.trim().is_empty()) {
            return SignerSource::PrivateKey(key.trim().to_string());
        }
        let phrase = env_mnemonic
            .filter(|m| !m.trim().is_empty())
            .or_else(|| parameters_mnemonic.map(str::to_string))
            .unwrap_or_else(|| DEFAULT_MNEMONIC.to_string());
        SignerSource::Mnemonic { phrase, index: 0 }
    }

    pub fn is_default(&self) -> bool {
        matches!(self, SignerSource::Mnemonic { phrase, .. } if phrase == DEFAULT_MNEMONIC)
    }

    /// Build the wallet, bound to `chain_id` for EIP-155 signatures.
    pub fn wallet(&self, chain_id: u64) -> Result<LocalWallet> {
        let wallet = match self {
            SignerSource::PrivateKey(key) => {
                LocalWallet::from_str(key).map_err(|e| SetupError::Signer(e.to_string()))?
            }
            SignerSource::Mnemonic { phrase, index } => MnemonicBuilder::<English>::default()
                .phrase(phrase.as_str())
                .index(*index)?
                .build()?,
        };
        Ok(wallet.with_chain_id(chain_id))
    }
}
