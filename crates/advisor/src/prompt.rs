use common::AdvisoryRequest;

/// Render the analyst prompt for one request.
pub fn build_prompt(request: &AdvisoryRequest) -> String {
    let recent = request
        .recent_prices
        .iter()
        .map(|p| format!("{:.2}", p.price))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "Analyze the following cryptocurrency market data for {instrument}:
- Current Price: ${current:.2}
- Recent Price Trend (last {count} periods): {recent}
- Moving Average: {sma}
- RSI: {rsi}

Based on this data, act as an expert crypto market analyst. Provide a short-term trading strategy.
Your analysis should be concise and clear. Formulate a concrete trading plan.",
        instrument = request.instrument,
        current = request.current_price,
        count = request.recent_prices.len(),
        sma = indicator_text(request.indicators.moving_average),
        rsi = indicator_text(request.indicators.rsi),
    )
}

fn indicator_text(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{v:.2}"))
}
