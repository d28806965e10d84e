//! What the screen shows for a given `DisplayState`.

use serde::Serialize;

use crate::pipeline::DisplayState;
use crate::types::WeatherCategory;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WeatherView {
    /// Status message if there is one, otherwise the city
    pub headline: String,
    pub date: String,
    /// True while the temperature is unknown
    pub loading: bool,
    pub icon: Option<&'static str>,
    pub temperature_text: Option<String>,
}

impl From<&DisplayState> for WeatherView {
    fn from(state: &DisplayState) -> Self {
        let headline = state.status.clone().unwrap_or_else(|| state.city.clone());

        match state.temperature {
            Some(temp) => Self {
                headline,
                date: state.date_label.clone(),
                loading: false,
                icon: Some(WeatherCategory::from_main(&state.weather_category).icon_name()),
                temperature_text: Some(format!("{}°C", temp)),
            },
            None => Self {
                headline,
                date: state.date_label.clone(),
                loading: true,
                icon: None,
                temperature_text: None,
            },
        }
    }
}

impl WeatherView {
    /// Plain-text rendering for a terminal.
    pub fn render(&self) -> String {
        let mut out = format!("{}\n{}\n\n", self.headline, self.date);
        match (&self.icon, &self.temperature_text) {
            (Some(icon), Some(temp)) => {
                out.push_str(&format!("[{}]\n{}\n", icon, temp));
            }
            _ => out.push_str("...\n"),
        }
        out
    }
}
