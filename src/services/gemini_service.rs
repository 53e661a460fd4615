//! Gemini Content Service
//!
//! Real [`ContentProvider`] over the Generative Language REST API. Every call
//! sends a natural-language prompt that demands a strict JSON reply; the
//! response text is stripped of markdown fences before parsing.
//!
//! ## Setup
//! 1. Get an API key from Google AI Studio
//! 2. Set the environment variable: `GEMINI_API_KEY=your_api_key_here`
//! 3. Optionally override the model with `GEMINI_MODEL`

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::{env, time::Duration};

use crate::models::tour::Poi;
use crate::services::providers::{ContentError, ContentProvider, PoiRanking};

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const DEFAULT_MODEL: &str = "gemini-3-flash-preview";
const REQUEST_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Content,
}

#[derive(Debug, Deserialize)]
struct GuardrailVerdict {
    valid: bool,
    #[serde(default)]
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidatePoiEntry {
    poi_title: String,
    address: String,
}

#[derive(Debug, Deserialize)]
struct OrderingResponse {
    ordered_pois: Vec<OrderedPoiEntry>,
}

#[derive(Debug, Deserialize)]
struct OrderedPoiEntry {
    original_index: usize,
    order: u32,
    #[serde(default)]
    story_keywords: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IntroductionResponse {
    introduction: String,
}

#[derive(Debug, Deserialize)]
struct StoriesResponse {
    stories: Vec<StoryEntry>,
}

#[derive(Debug, Deserialize)]
struct StoryEntry {
    order: u32,
    story: String,
}

pub struct GeminiService {
    client: Client,
    api_key: String,
    model: String,
}

impl GeminiService {
    pub fn new() -> Result<Self, ContentError> {
        let api_key = env::var("GEMINI_API_KEY").map_err(|_| ContentError::MissingApiKey)?;
        let model = env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());

        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            api_key,
            model,
        })
    }

    async fn generate_text(&self, prompt: &str) -> Result<String, ContentError> {
        let url = format!("{}/{}:generateContent", GEMINI_API_BASE, self.model);
        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
        };

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ContentError::Response(format!(
                "Gemini request failed with status {}: {}",
                status, body
            )));
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| ContentError::Response(format!("Failed to parse Gemini envelope: {}", e)))?;

        let text: String = parsed
            .candidates
            .into_iter()
            .next()
            .map(|c| c.content.parts.into_iter().map(|p| p.text).collect())
            .unwrap_or_default();

        if text.is_empty() {
            return Err(ContentError::Response(
                "Gemini returned no candidates".to_string(),
            ));
        }

        Ok(text)
    }
}

#[async_trait]
impl ContentProvider for GeminiService {
    async fn validate_request(
        &self,
        user_address: &str,
        max_time: &str,
        distance: &str,
        custom_message: &str,
    ) -> Result<bool, ContentError> {
        let prompt = guardrail_prompt(user_address, max_time, distance, custom_message);
        let text = self.generate_text(&prompt).await?;

        match serde_json::from_str::<GuardrailVerdict>(strip_markdown_fences(&text)) {
            Ok(verdict) => {
                log::info!(
                    "Guardrail validation for '{}' at '{}': {} ({})",
                    custom_message,
                    user_address,
                    verdict.valid,
                    verdict.reason.as_deref().unwrap_or("no reason provided")
                );
                Ok(verdict.valid)
            }
            Err(e) => {
                // An unreadable verdict is treated as a rejection, not an error.
                log::warn!("Failed to parse guardrail response as JSON: {}", e);
                Ok(false)
            }
        }
    }

    async fn generate_themes(&self, address: &str) -> Result<HashMap<String, String>, ContentError> {
        let text = self.generate_text(&theme_prompt(address)).await?;
        serde_json::from_str(strip_markdown_fences(&text)).map_err(|e| {
            ContentError::Response(format!("Failed to parse theme options as JSON: {}", e))
        })
    }

    async fn generate_pois(
        &self,
        address: &str,
        time_constraint: &str,
        distance_constraint: &str,
        preferences: &str,
    ) -> Result<Vec<Poi>, ContentError> {
        let prompt = poi_prompt(address, time_constraint, distance_constraint, preferences);
        let text = self.generate_text(&prompt).await?;

        let entries: Vec<CandidatePoiEntry> = serde_json::from_str(strip_markdown_fences(&text))
            .map_err(|e| {
                ContentError::Response(format!("Failed to parse POI list as JSON: {}", e))
            })?;

        Ok(entries
            .into_iter()
            .map(|entry| Poi::candidate(entry.poi_title, entry.address))
            .collect())
    }

    async fn order_pois(
        &self,
        pois: &[Poi],
        origin: &str,
        max_time: &str,
        distance: &str,
        theme: &str,
        feedback: Option<&str>,
    ) -> Result<Vec<PoiRanking>, ContentError> {
        let prompt = ordering_prompt(pois, origin, max_time, distance, theme, feedback);
        let text = self.generate_text(&prompt).await?;
        parse_ordering_response(&text)
    }

    async fn generate_introduction(
        &self,
        pois: &[Poi],
        theme: &str,
    ) -> Result<String, ContentError> {
        let text = self
            .generate_text(&introduction_prompt(pois, theme))
            .await?;
        let parsed: IntroductionResponse = serde_json::from_str(strip_markdown_fences(&text))
            .map_err(|e| {
                ContentError::Response(format!("Failed to parse introduction as JSON: {}", e))
            })?;
        Ok(parsed.introduction)
    }

    async fn generate_stories(&self, pois: &[Poi], theme: &str) -> Result<Vec<String>, ContentError> {
        let text = self.generate_text(&stories_prompt(pois, theme)).await?;
        parse_stories_response(&text)
    }
}

/// Gemini wraps JSON replies in markdown fences often enough that every parse
/// goes through this first.
fn strip_markdown_fences(text: &str) -> &str {
    let mut inner = text.trim();
    if let Some(rest) = inner.strip_prefix("```json") {
        inner = rest;
    } else if let Some(rest) = inner.strip_prefix("```") {
        inner = rest;
    }
    if let Some(rest) = inner.strip_suffix("```") {
        inner = rest;
    }
    inner.trim()
}

fn parse_ordering_response(text: &str) -> Result<Vec<PoiRanking>, ContentError> {
    let parsed: OrderingResponse = serde_json::from_str(strip_markdown_fences(text))
        .map_err(|e| ContentError::Response(format!("Failed to parse ordering as JSON: {}", e)))?;

    if parsed.ordered_pois.is_empty() {
        return Err(ContentError::Response(
            "Ordering response contained no entries".to_string(),
        ));
    }

    Ok(parsed
        .ordered_pois
        .into_iter()
        .map(|entry| PoiRanking {
            original_index: entry.original_index,
            order: entry.order,
            story_keywords: entry.story_keywords,
        })
        .collect())
}

fn parse_stories_response(text: &str) -> Result<Vec<String>, ContentError> {
    let parsed: StoriesResponse = serde_json::from_str(strip_markdown_fences(text))
        .map_err(|e| ContentError::Response(format!("Failed to parse stories as JSON: {}", e)))?;

    if parsed.stories.is_empty() {
        return Err(ContentError::Response(
            "Stories response contained no entries".to_string(),
        ));
    }

    let mut entries = parsed.stories;
    entries.sort_by_key(|entry| entry.order);
    Ok(entries.into_iter().map(|entry| entry.story).collect())
}

/// The ordered POI list as it appears in prompts. Geometry and image fields
/// never reach the provider.
fn poi_lines(pois: &[Poi]) -> String {
    pois.iter()
        .enumerate()
        .map(|(i, poi)| format!("{}. {} - {}\n", i + 1, poi.poi_title, poi.address))
        .collect()
}

fn theme_prompt(address: &str) -> String {
    format!(
        r#"You are a creative tour guide and travel expert. Given a location address, generate 5 unique and engaging thematic tour options that visitors could experience at or near this location.

Location Address: {address}

IMPORTANT: Return ONLY a valid JSON object mapping each theme name to a one-line engaging summary of what the tour offers, nothing else.

Guidelines:
- Each theme name MUST start with a relevant emoji that represents the theme (e.g., "🏛️ Historical Heritage Walk", "🍜 Foodie's Paradise Tour")
- Make theme names catchy and descriptive
- Keep summaries to one engaging sentence (max 20 words)
- Consider the location's history, culture, food, architecture, nature, shopping, nightlife, and local experiences
- Make each theme distinct and appealing to different traveler interests
- Ensure the JSON is properly formatted with double quotes

Return ONLY the JSON object, no additional text or explanation."#
    )
}

fn poi_prompt(address: &str, time_constraint: &str, distance_constraint: &str, preferences: &str) -> String {
    format!(
        r#"You are a knowledgeable local tour guide. Based on the user's current location and their constraints, recommend relevant Points of Interest (POIs) they can visit.

User Location: {address}

Constraints:
- Time Available: {time_constraint}
- Maximum Distance: {distance_constraint}
- User Preferences: {preferences}

IMPORTANT: Return ONLY a valid JSON array with the following structure, nothing else:
[
    {{
        "poi_title": "Name of the POI",
        "address": "Full address of the POI"
    }}
]

Guidelines:
- Generate 5-10 POIs that can realistically be visited within the given time and distance constraints
- Prioritize POIs that match the user's preferences
- Include a variety of POI types (attractions, restaurants, parks, museums, shops, etc.) unless user preferences specify otherwise
- Provide complete, accurate addresses for each POI
- Order POIs by relevance and proximity
- Consider travel time between POIs when selecting them

Return ONLY the JSON array, no additional text or explanation."#
    )
}

fn guardrail_prompt(user_address: &str, max_time: &str, distance: &str, custom_message: &str) -> String {
    format!(
        r#"You are a location and tour validation expert. Your job is to determine if a user's tour request makes sense given their current location.

User's Current Location: {user_address}

User's Tour Request:
- Maximum Time Available: {max_time}
- Maximum Distance Willing to Travel: {distance}
- Custom Preferences/Request: {custom_message}

Please analyze if this tour request is legitimate and makes sense for the user's location. Consider:

1. Geographic Relevance: Does the custom request relate to things that could reasonably be found in or near the user's location?
   - Example: "chicken rice tour" in Singapore = VALID
   - Example: "chicken rice tour" in New York = INVALID (chicken rice is specific to Singapore/Malaysia)
   - Example: "pizza tour" in New York = VALID

2. Feasibility: Can the request be fulfilled within the given time and distance constraints for that location?

3. Cultural/Geographic Match: Does the request match the cultural or geographic context of the location?
   - Example: "surfing tour" in Hawaii = VALID
   - Example: "surfing tour" in landlocked Switzerland = INVALID
   - Example: "beach tour" in Paris = INVALID (no beaches in Paris)

Return your answer in this EXACT JSON format, nothing else:
{{
    "valid": true or false,
    "reason": "Brief explanation of why this is valid or invalid"
}}

IMPORTANT: Return ONLY the JSON object, no additional text."#
    )
}

fn ordering_prompt(
    pois: &[Poi],
    origin: &str,
    max_time: &str,
    distance: &str,
    theme: &str,
    feedback: Option<&str>,
) -> String {
    let feedback_text = match feedback {
        Some(feedback) => format!(
            "\nIMPORTANT FEEDBACK FROM PREVIOUS ATTEMPT:\n{feedback}\nPlease adjust the plan to address this feedback. You may remove less important POIs if necessary to meet constraints.\n"
        ),
        None => String::new(),
    };

    format!(
        r#"You are an expert tour planner. Given a list of Points of Interest (POIs) and constraints, determine the optimal order to visit them as a round trip that starts and ends at the starting location.

Starting Location: {origin}

Tour Theme: {theme}

Constraints:
- Maximum Time: {max_time}
- Maximum Distance: {distance}
{feedback_text}
POIs to visit:
{poi_list}

Please determine the most efficient order to visit these POIs considering:
1. Proximity to the starting location and to each other (minimize travel distance, including the walk back to the start)
2. Logical flow that makes sense for the tour theme
3. Time constraints (can all POIs be visited within the time limit?)
4. Creating a good tour experience (avoid excessive backtracking)

Return your answer in this EXACT JSON format, nothing else:
{{
    "ordered_pois": [
        {{
            "original_index": 1,
            "order": 1,
            "story_keywords": "2-4 comma-separated keywords tying this stop to the theme"
        }}
    ]
}}

IMPORTANT:
- Use original_index to reference POIs from the input list (starting from 1)
- The "order" field is the sequence in the tour (1 = first stop, 2 = second stop, etc.)
- Return ONLY the JSON object, no additional text."#,
        poi_list = poi_lines(pois),
    )
}

fn introduction_prompt(pois: &[Poi], theme: &str) -> String {
    format!(
        r#"You are a charismatic walking-tour guide. Write a short introduction (40-60 words) welcoming the visitor to a tour with the theme "{theme}" that visits these stops in order:

{poi_list}
Return your answer in this EXACT JSON format, nothing else:
{{
    "introduction": "The introduction text"
}}

Return ONLY the JSON object, no additional text."#,
        poi_list = poi_lines(pois),
    )
}

fn stories_prompt(pois: &[Poi], theme: &str) -> String {
    let poi_list: String = pois
        .iter()
        .map(|poi| {
            format!(
                "{}. {} - {} (keywords: {})\n",
                poi.order.unwrap_or(0),
                poi.poi_title,
                poi.address,
                poi.story_keywords.as_deref().unwrap_or("none")
            )
        })
        .collect();

    format!(
        r#"You are a storytelling walking-tour guide. For each stop of the tour below, write a short narrative story (30-50 words) in the voice of a guide walking with the visitor. The tour theme is "{theme}". Consecutive stories may reference each other (e.g. "next, a short walk away...") so the tour flows as one narrative.

Stops, in visiting order:
{poi_list}
Return your answer in this EXACT JSON format, nothing else:
{{
    "stories": [
        {{
            "order": 1,
            "story": "The story for the first stop"
        }}
    ]
}}

IMPORTANT:
- Provide exactly one story per stop, matching the "order" numbers above
- Return ONLY the JSON object, no additional text."#
    )
}
