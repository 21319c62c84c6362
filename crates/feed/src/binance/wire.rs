use serde::Deserialize;
use serde_json::{json, Value};

use common::{Instrument, PriceUpdate, Result};

#[derive(Deserialize)]
struct TradeEvent {
    #[serde(rename = "s")]
    symbol: String,
    #[serde(rename = "p")]
    price: WirePrice,
}

/// Binance sends prices as strings; numbers are accepted too.
#[derive(Deserialize)]
#[serde(untagged)]
enum WirePrice {
    Text(String),
    Number(f64),
}

impl WirePrice {
    fn value(&self) -> Option<f64> {
        match self {
            WirePrice::Text(s) => s.trim().parse().ok(),
            WirePrice::Number(n) => Some(*n),
        }
    }
}

/// Parse one inbound feed message.
///
/// `Ok(None)` covers everything that is not a trade for a tracked instrument:
/// subscription acks, other event types, unknown symbols, unusable prices.
/// `Err` means the text was not JSON of the expected shape.
pub fn parse_trade_event(text: &str) -> Result<Option<PriceUpdate>> {
    let mut value: Value = serde_json::from_str(text)?;

    // Combined-stream envelope: {"stream": "...", "data": {...}}
    if value.get("stream").is_some() {
        if let Some(data) = value.get_mut("data") {
            value = data.take();
        }
    }

    // Trade messages have an "e" field set to "trade"
    if value.get("e").and_then(Value::as_str) != Some("trade") {
        return Ok(None);
    }

    let trade: TradeEvent = serde_json::from_value(value)?;
    let Some(instrument) = Instrument::from_wire_symbol(&trade.symbol) else {
        return Ok(None);
    };

    match trade.price.value() {
        Some(price) if price.is_finite() && price > 0.0 => {
            Ok(Some(PriceUpdate { instrument, price }))
        }
        _ => Ok(None),
    }
}

/// Single multiplexed SUBSCRIBE request naming every instrument's trade stream.
pub fn subscribe_frame(instruments: &[Instrument]) -> String {
    let streams: Vec<String> = instruments
        .iter()
        .map(|i| format!("{}@trade", i.wire_symbol()))
        .collect();
    json!({
        "method": "SUBSCRIBE",
        "params": streams,
        "id": 1,
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_binance_trade() {
        let text = r#"{"e":"trade","E":1718000000000,"s":"BTCUSDT","t":12345,"p":"68123.45","q":"0.010","T":1718000000000,"m":true}"#;
        let update = parse_trade_event(text).unwrap().unwrap();
        assert_eq!(update.instrument, Instrument::BtcUsd);
        assert_eq!(update.price, 68123.45);
    }

    #[test]
    fn accepts_numeric_price_and_combined_envelope() {
        let text = r#"{"stream":"ethusdt@trade","data":{"e":"trade","s":"ETHUSDT","p":3801.5}}"#;
        let update = parse_trade_event(text).unwrap().unwrap();
        assert_eq!(update.instrument, Instrument::EthUsd);
        assert_eq!(update.price, 3801.5);
    }

    #[test]
    fn ignores_non_trade_messages() {
        assert!(parse_trade_event(r#"{"result":null,"id":1}"#).unwrap().is_none());
        assert!(parse_trade_event(r#"{"e":"kline","s":"BTCUSDT","p":"1"}"#)
            .unwrap()
            .is_none());
    }

    #[test]
    fn ignores_untracked_symbols_and_bad_prices() {
        assert!(parse_trade_event(r#"{"e":"trade","s":"SOLUSDT","p":"150"}"#)
            .unwrap()
            .is_none());
        assert!(parse_trade_event(r#"{"e":"trade","s":"BTCUSDT","p":"abc"}"#)
            .unwrap()
            .is_none());
        assert!(parse_trade_event(r#"{"e":"trade","s":"BTCUSDT","p":"-1"}"#)
            .unwrap()
            .is_none());
    }

    #[test]
    fn malformed_text_is_an_error() {
        assert!(parse_trade_event("not json").is_err());
        assert!(parse_trade_event(r#"{"e":"trade","p":"1"}"#).is_err());
    }

    #[test]
    fn subscribe_frame_names_every_stream() {
        let frame: Value = serde_json::from_str(&subscribe_frame(&Instrument::ALL)).unwrap();
        assert_eq!(frame["method"], "SUBSCRIBE");
        assert_eq!(frame["params"], json!(["btcusdt@trade", "ethusdt@trade"]));
    }
}
