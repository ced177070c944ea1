//! Mock weather tools.
//!
//! These return deterministic canned data so the weather agent can be
//! exercised without a real weather API.

use async_trait::async_trait;
use chrono::{Datelike, Duration, Local, Weekday};
use serde_json::{json, Map, Value};

use super::{ParamSpec, ParamType, Tool};

const MAX_FORECAST_DAYS: i64 = 7;

struct CityWeather {
    names: &'static [&'static str],
    temperature: i64,
    weather: &'static str,
    humidity: u32,
}

const CITIES: &[CityWeather] = &[
    CityWeather {
        names: &["beijing", "北京"],
        temperature: 18,
        weather: "Cloudy",
        humidity: 45,
    },
    CityWeather {
        names: &["shanghai", "上海"],
        temperature: 25,
        weather: "Light rain",
        humidity: 78,
    },
    CityWeather {
        names: &["guangzhou", "广州"],
        temperature: 28,
        weather: "Sunny",
        humidity: 82,
    },
    CityWeather {
        names: &["shenzhen", "深圳"],
        temperature: 27,
        weather: "Overcast",
        humidity: 75,
    },
    CityWeather {
        names: &["hangzhou", "杭州"],
        temperature: 23,
        weather: "Sunny",
        humidity: 60,
    },
];

const DEFAULT_WEATHER: CityWeather = CityWeather {
    names: &[],
    temperature: 22,
    weather: "Sunny",
    humidity: 65,
};

const FORECAST_PATTERNS: &[&str] = &["Sunny", "Cloudy", "Light rain", "Overcast"];
const FORECAST_HIGHS: &[i64] = &[20, 22, 25, 18, 27];

/// Cities with dedicated mock data.
pub fn supported_cities() -> Vec<&'static str> {
    CITIES.iter().map(|c| c.names[0]).collect()
}

fn lookup_city(city: &str) -> &'static CityWeather {
    let needle = city.trim().to_lowercase();
    CITIES
        .iter()
        .find(|c| c.names.iter().any(|n| *n == needle))
        .unwrap_or(&DEFAULT_WEATHER)
}

fn require_city(args: &Map<String, Value>) -> anyhow::Result<&str> {
    let city = args
        .get("city")
        .and_then(Value::as_str)
        .map(str::trim)
        .ok_or_else(|| anyhow::anyhow!("Missing 'city' argument"))?;
    if city.is_empty() {
        anyhow::bail!("'city' must not be empty");
    }
    Ok(city)
}

fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// Current conditions for a city.
pub struct CurrentWeather;

#[async_trait]
impl Tool for CurrentWeather {
    fn name(&self) -> &str {
        "get_current_weather"
    }

    fn description(&self) -> &str {
        "Get the current weather for a city. Returns JSON with temperature, weather, humidity, wind and air quality."
    }

    fn parameters(&self) -> Vec<ParamSpec> {
        vec![ParamSpec::required(
            "city",
            ParamType::String,
            "City name, e.g. Beijing, Shanghai, Guangzhou",
        )]
    }

    async fn execute(&self, args: &Map<String, Value>) -> anyhow::Result<Value> {
        let city = require_city(args)?;
        let data = lookup_city(city);

        Ok(json!({
            "city": city,
            "current_time": Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            "temperature": format!("{}°C", data.temperature),
            "weather": data.weather,
            "humidity": format!("{}%", data.humidity),
            "wind_speed": "Light breeze, force 2",
            "air_quality": "Good",
            "description": format!(
                "{} is currently {} at {}°C",
                city,
                data.weather.to_lowercase(),
                data.temperature
            ),
        }))
    }
}

/// Multi-day forecast for a city.
pub struct WeatherForecast;

#[async_trait]
impl Tool for WeatherForecast {
    fn name(&self) -> &str {
        "get_weather_forecast"
    }

    fn description(&self) -> &str {
        "Get the weather forecast for a city for the next few days (default 3, at most 7)."
    }

    fn parameters(&self) -> Vec<ParamSpec> {
        vec![
            ParamSpec::required("city", ParamType::String, "City name"),
            ParamSpec::optional("days", ParamType::Integer, "Number of days to forecast (1-7, default 3)"),
        ]
    }

    async fn execute(&self, args: &Map<String, Value>) -> anyhow::Result<Value> {
        let city = require_city(args)?;
        let days = args.get("days").and_then(Value::as_i64).unwrap_or(3);
        if !(1..=MAX_FORECAST_DAYS).contains(&days) {
            anyhow::bail!("'days' must be between 1 and {}, got {}", MAX_FORECAST_DAYS, days);
        }

        let today = Local::now().date_naive();
        let forecast: Vec<Value> = (0..days)
            .map(|i| {
                let date = today + Duration::days(i + 1);
                let idx = i as usize;
                let high = FORECAST_HIGHS[idx % FORECAST_HIGHS.len()];
                json!({
                    "date": date.format("%Y-%m-%d").to_string(),
                    "day_of_week": weekday_name(date.weekday()),
                    "weather": FORECAST_PATTERNS[idx % FORECAST_PATTERNS.len()],
                    "high_temp": format!("{}°C", high),
                    "low_temp": format!("{}°C", high - 5),
                    "humidity": format!("{}%", 60 + i * 5),
                })
            })
            .collect();

        Ok(json!({
            "city": city,
            "forecast_days": days,
            "forecast": forecast,
        }))
    }
}

/// Clothing and activity advice derived from a weather report.
pub struct WeatherSuggestion;

#[async_trait]
impl Tool for WeatherSuggestion {
    fn name(&self) -> &str {
        "get_weather_suggestion"
    }

    fn description(&self) -> &str {
        "Give practical advice from a weather report. Pass the JSON returned by get_current_weather."
    }

    fn parameters(&self) -> Vec<ParamSpec> {
        vec![ParamSpec::required(
            "weather_info",
            ParamType::String,
            "Weather report JSON, as returned by get_current_weather",
        )]
    }

    async fn execute(&self, args: &Map<String, Value>) -> anyhow::Result<Value> {
        let raw = args
            .get("weather_info")
            .ok_or_else(|| anyhow::anyhow!("Missing 'weather_info' argument"))?;

        // Accept the report either as a JSON string or as an inline object.
        let report: Value = match raw {
            Value::String(s) => serde_json::from_str(s)
                .map_err(|e| anyhow::anyhow!("'weather_info' is not valid JSON: {}", e))?,
            other => other.clone(),
        };

        Ok(Value::String(suggest(&report)))
    }
}

fn suggest(report: &Value) -> String {
    let weather = report["weather"].as_str().unwrap_or_default().to_lowercase();
    let temperature = report["temperature"]
        .as_str()
        .and_then(|t| t.trim_end_matches("°C").trim().parse::<i64>().ok());

    let mut suggestions = Vec::new();

    if weather.contains("rain") {
        suggestions.push("It is raining, take an umbrella.");
        suggestions.push("Roads may be slippery, travel carefully.");
    } else if weather.contains("sunny") {
        suggestions.push("Clear skies, a good day for outdoor activities.");
        suggestions.push("The sun is strong, consider sunglasses.");
    } else if weather.contains("cloudy") || weather.contains("overcast") {
        suggestions.push("Skies are grey and may change quickly.");
        suggestions.push("Bring a jacket just in case.");
    }

    match temperature {
        Some(t) if t < 10 => suggestions.push("It is cold, dress warmly."),
        Some(t) if t > 30 => suggestions.push("It is hot, stay hydrated and avoid the midday sun."),
        Some(t) if (20..=25).contains(&t) => suggestions.push("The temperature is comfortable."),
        _ => {}
    }

    if suggestions.is_empty() {
        "Weather looks normal, adjust clothing as needed.".to_string()
    } else {
        suggestions.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(pairs: &[(&str, Value)]) -> Map<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[tokio::test]
    async fn known_city_uses_overrides() {
        let out = CurrentWeather
            .execute(&args(&[("city", json!("Shanghai"))]))
            .await
            .unwrap();
        assert_eq!(out["temperature"], "25°C");
        assert_eq!(out["weather"], "Light rain");

        let out = CurrentWeather
            .execute(&args(&[("city", json!("北京"))]))
            .await
            .unwrap();
        assert_eq!(out["weather"], "Cloudy");
    }

    #[tokio::test]
    async fn unknown_city_gets_defaults() {
        let out = CurrentWeather
            .execute(&args(&[("city", json!("Reykjavik"))]))
            .await
            .unwrap();
        assert_eq!(out["temperature"], "22°C");
        assert_eq!(out["city"], "Reykjavik");
    }

    #[tokio::test]
    async fn forecast_has_requested_days() {
        let out = WeatherForecast
            .execute(&args(&[("city", json!("Hangzhou")), ("days", json!(5))]))
            .await
            .unwrap();
        let days = out["forecast"].as_array().unwrap();
        assert_eq!(days.len(), 5);
        assert_eq!(days[0]["weather"], "Sunny");
        assert_eq!(days[0]["low_temp"], "15°C");
        assert_eq!(days[4]["humidity"], "80%");
        assert_ne!(days[0]["date"], days[1]["date"]);
    }

    #[tokio::test]
    async fn forecast_rejects_out_of_range_days() {
        let err = WeatherForecast
            .execute(&args(&[("city", json!("Hangzhou")), ("days", json!(30))]))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("between 1 and 7"));
    }

    #[tokio::test]
    async fn suggestion_reads_report_string() {
        let report = json!({"weather": "Light rain", "temperature": "22°C"}).to_string();
        let out = WeatherSuggestion
            .execute(&args(&[("weather_info", json!(report))]))
            .await
            .unwrap();
        let text = out.as_str().unwrap();
        assert!(text.contains("umbrella"));
        assert!(text.contains("comfortable"));
    }

    #[tokio::test]
    async fn suggestion_rejects_invalid_json() {
        let err = WeatherSuggestion
            .execute(&args(&[("weather_info", json!("not json"))]))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not valid JSON"));
    }

    #[test]
    fn supported_cities_lists_primary_names() {
        assert_eq!(supported_cities()[0], "beijing");
        assert_eq!(supported_cities().len(), 5);
    }
}
