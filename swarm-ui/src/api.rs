use chrono::Utc;
use gloo_net::http::Request;
use std::sync::OnceLock;
use swarm_types::{
    ConversationStatusResponse, SessionExport, SessionMessage, SessionSummary, Source,
    SwarmStatusResponse,
};

/// Get the API base URL based on current environment
/// - In development (localhost): use http://localhost:8080
/// - In production: use same origin (API serves static files)
fn get_api_base() -> String {
    // Get the current hostname from the browser
    let hostname = web_sys::window()
        .and_then(|w| w.location().hostname().ok())
        .unwrap_or_default();

    // If running on localhost, point to the API server on port 8080
    if hostname == "localhost" || hostname == "127.0.0.1" {
        "http://localhost:8080".to_string()
    } else {
        // In production, use same origin
        "".to_string()
    }
}

/// Lazy-static equivalent for WASM - computed at first use
static API_BASE_CACHE: OnceLock<String> = OnceLock::new();

/// Get the cached API base URL
pub fn api_base() -> &'static str {
    API_BASE_CACHE.get_or_init(get_api_base).as_str()
}

// ============================================================================
// Conversation Flow
// ============================================================================

#[derive(Debug, serde::Serialize)]
pub struct StartConversationRequest {
    pub message: String,
}

#[derive(Debug, serde::Deserialize)]
pub struct StartConversationResponse {
    pub success: bool,
    pub session_id: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, serde::Serialize)]
pub struct ContinueConversationRequest {
    pub session_id: String,
    pub message: String,
}

pub async fn start_conversation(message: &str) -> Result<String, String> {
    let url = format!("{}/conversation/start", api_base());

    let request = StartConversationRequest {
        message: message.to_string(),
    };

    let response = Request::post(&url)
        .json(&request)
        .map_err(|e| format!("Failed to serialize request: {e}"))?
        .send()
        .await
        .map_err(|e| format!("Request failed: {e}"))?;

    if !response.ok() {
        return Err(format!("HTTP error: {}", response.status()));
    }

    let data: StartConversationResponse = response
        .json()
        .await
        .map_err(|e| format!("Failed to parse JSON: {e}"))?;

    if !data.success {
        return Err(data.error.unwrap_or_else(|| "Unknown error".to_string()));
    }

    data.session_id
        .ok_or_else(|| "Session id not returned".to_string())
}

pub async fn continue_conversation(session_id: &str, message: &str) -> Result<(), String> {
    let url = format!("{}/conversation/continue", api_base());

    let request = ContinueConversationRequest {
        session_id: session_id.to_string(),
        message: message.to_string(),
    };

    let response = Request::post(&url)
        .json(&request)
        .map_err(|e| format!("Failed to serialize request: {e}"))?
        .send()
        .await
        .map_err(|e| format!("Request failed: {e}"))?;

    if !response.ok() {
        return Err(format!("HTTP error: {}", response.status()));
    }

    #[derive(Debug, serde::Deserialize)]
    struct Response {
        success: bool,
        error: Option<String>,
    }

    let data: Response = response
        .json()
        .await
        .map_err(|e| format!("Failed to parse JSON: {e}"))?;

    if !data.success {
        return Err(data.error.unwrap_or_else(|| "Unknown error".to_string()));
    }

    Ok(())
}

pub async fn fetch_conversation_status(
    session_id: &str,
) -> Result<ConversationStatusResponse, String> {
    let url = format!("{}/conversation/status/{}", api_base(), session_id);

    let response = Request::get(&url)
        .send()
        .await
        .map_err(|e| format!("Request failed: {e}"))?;

    if !response.ok() {
        return Err(format!("HTTP error: {}", response.status()));
    }

    let data: ConversationStatusResponse = response
        .json()
        .await
        .map_err(|e| format!("Failed to parse JSON: {e}"))?;

    if !data.success {
        return Err("API returned success=false".to_string());
    }

    Ok(data)
}

#[derive(Debug, serde::Deserialize)]
pub struct GetSessionsResponse {
    pub success: bool,
    pub sessions: Vec<SessionSummary>,
}

pub async fn fetch_sessions() -> Result<Vec<SessionSummary>, String> {
    let url = format!("{}/conversation/sessions", api_base());

    let response = Request::get(&url)
        .send()
        .await
        .map_err(|e| format!("Request failed: {e}"))?;

    if !response.ok() {
        return Err(format!("HTTP error: {}", response.status()));
    }

    let data: GetSessionsResponse = response
        .json()
        .await
        .map_err(|e| format!("Failed to parse JSON: {e}"))?;

    if !data.success {
        return Err("API returned success=false".to_string());
    }

    Ok(data.sessions)
}

pub async fn delete_session(session_id: &str) -> Result<(), String> {
    let url = format!("{}/conversation/session/{}", api_base(), session_id);

    let response = Request::delete(&url)
        .send()
        .await
        .map_err(|e| format!("Request failed: {e}"))?;

    if !response.ok() {
        return Err(format!("HTTP error: {}", response.status()));
    }

    #[derive(Debug, serde::Deserialize)]
    struct Response {
        success: bool,
        error: Option<String>,
    }

    let data: Response = response
        .json()
        .await
        .map_err(|e| format!("Failed to parse JSON: {e}"))?;

    if !data.success {
        return Err(data.error.unwrap_or_else(|| "Unknown error".to_string()));
    }

    Ok(())
}

// ============================================================================
// Swarm Execution Flow
// ============================================================================

#[derive(Debug, serde::Serialize)]
pub struct StartSwarmRequest {
    pub goal: String,
}

#[derive(Debug, serde::Deserialize)]
pub struct StartSwarmResponse {
    pub success: bool,
    pub session_id: Option<String>,
    pub error: Option<String>,
}

pub async fn start_swarm(goal: &str) -> Result<String, String> {
    let url = format!("{}/swarm/start", api_base());

    let request = StartSwarmRequest {
        goal: goal.to_string(),
    };

    let response = Request::post(&url)
        .json(&request)
        .map_err(|e| format!("Failed to serialize request: {e}"))?
        .send()
        .await
        .map_err(|e| format!("Request failed: {e}"))?;

    if !response.ok() {
        return Err(format!("HTTP error: {}", response.status()));
    }

    let data: StartSwarmResponse = response
        .json()
        .await
        .map_err(|e| format!("Failed to parse JSON: {e}"))?;

    if !data.success {
        return Err(data.error.unwrap_or_else(|| "Unknown error".to_string()));
    }

    data.session_id
        .ok_or_else(|| "Session id not returned".to_string())
}

#[derive(Debug, serde::Serialize)]
pub struct ContinueSwarmRequest {
    pub session_id: String,
    pub message: String,
}

/// Answer a human-input pause in a running swarm execution.
pub async fn continue_swarm(session_id: &str, message: &str) -> Result<(), String> {
    let url = format!("{}/swarm/continue", api_base());

    let request = ContinueSwarmRequest {
        session_id: session_id.to_string(),
        message: message.to_string(),
    };

    let response = Request::post(&url)
        .json(&request)
        .map_err(|e| format!("Failed to serialize request: {e}"))?
        .send()
        .await
        .map_err(|e| format!("Request failed: {e}"))?;

    if !response.ok() {
        return Err(format!("HTTP error: {}", response.status()));
    }

    #[derive(Debug, serde::Deserialize)]
    struct Response {
        success: bool,
        error: Option<String>,
    }

    let data: Response = response
        .json()
        .await
        .map_err(|e| format!("Failed to parse JSON: {e}"))?;

    if !data.success {
        return Err(data.error.unwrap_or_else(|| "Unknown error".to_string()));
    }

    Ok(())
}

pub async fn fetch_swarm_status(session_id: &str) -> Result<SwarmStatusResponse, String> {
    let url = format!("{}/swarm/status/{}", api_base(), session_id);

    let response = Request::get(&url)
        .send()
        .await
        .map_err(|e| format!("Request failed: {e}"))?;

    if !response.ok() {
        return Err(format!("HTTP error: {}", response.status()));
    }

    let data: SwarmStatusResponse = response
        .json()
        .await
        .map_err(|e| format!("Failed to parse JSON: {e}"))?;

    if !data.success {
        return Err("API returned success=false".to_string());
    }

    Ok(data)
}

// ============================================================================
// Export
// ============================================================================

/// Snapshot a session into the downloadable export shape.
pub fn build_session_export(
    session_id: &str,
    messages: Vec<SessionMessage>,
    sources: Vec<Source>,
) -> SessionExport {
    SessionExport {
        session_id: session_id.to_string(),
        messages,
        sources,
        timestamp: Utc::now(),
    }
}
