use serde::{Deserialize, Serialize};

use courier::service_contract;
use courier::CallParam;

#[derive(CallParam, Default, Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArithAddArgs {
    #[serde(rename = "A")]
    pub a: u64,
    #[serde(rename = "B")]
    pub b: u64,
}

#[derive(CallParam, Default, Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArithAddReply {
    #[serde(rename = "C")]
    pub c: u64,
}

service_contract! {
    contract Arith {
        group: "demo",
        version: "1.0.0",
    }
    stub ArithStub {
        fn add(ArithAddArgs) -> ArithAddReply;
        fn mul(ArithAddArgs) -> ArithAddReply;
    }
}

#[cfg(test)]
mod tests {
    use courier::SerializeType;

    use super::*;

    #[test]
    fn args_round_trip_json() {
        let args = ArithAddArgs { a: 7, b: 6 };
        let bytes = args.into_bytes(SerializeType::Json).unwrap();
        let mut decoded = ArithAddArgs::default();
        decoded.from_slice(SerializeType::Json, &bytes).unwrap();
        assert_eq!(args, decoded);
    }
}
