use crate::selector::WeightTable;
use kvload_core::{OperationKind, PAYLOAD_VALUE_LEN};
use rand::Rng;
use serde::{Deserialize, Serialize};

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// JSON body sent with a put.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payload {
    pub value: String,
}

/// One request, fully decided before it is handed to an issuer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub operation: OperationKind,
    pub key: String,
    pub payload: Option<Payload>,
}

impl Request {
    /// Draws the next request: the operation, then the key, then (for puts) the value.
    pub fn generate<R: Rng>(table: &WeightTable, key_space: u32, rng: &mut R) -> Self {
        let operation = table.select(rng.gen());
        let key = format!("key{}", rng.gen_range(0..key_space.max(1)));
        let payload = match operation {
            OperationKind::Put => Some(Payload {
                value: random_value(rng),
            }),
            OperationKind::Get | OperationKind::Delete => None,
        };

        Self {
            operation,
            key,
            payload,
        }
    }
}

fn random_value<R: Rng>(rng: &mut R) -> String {
    (0..PAYLOAD_VALUE_LEN)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect()
}
