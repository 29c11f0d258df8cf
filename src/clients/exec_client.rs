use reqwest::Client;
use serde_json::json;

/// A language the execution service understands, with the version index
/// it expects for it.
#[derive(Debug, Clone, Copy)]
pub struct ExecLanguage {
    pub name: &'static str,
    pub version: u8,
}

/// Map an editor language id to the execution service's identifier.
pub fn lookup_language(id: &str) -> Option<ExecLanguage> {
    let lang = match id {
        "java" => ExecLanguage { name: "java", version: 4 },
        "python" => ExecLanguage { name: "python3", version: 4 },
        "c_cpp" => ExecLanguage { name: "cpp17", version: 0 },
        "golang" => ExecLanguage { name: "go", version: 4 },
        "csharp" => ExecLanguage { name: "csharp", version: 4 },
        "nodejs" => ExecLanguage { name: "nodejs", version: 4 },
        "rust" => ExecLanguage { name: "rust", version: 4 },
        _ => return None,
    };
    Some(lang)
}

/// Client for the external code execution service. Fully stateless:
/// nothing here touches the session engine.
#[derive(Debug)]
pub struct ExecServiceClient {
    client: Client,
    base_url: String,
    client_id: String,
    client_secret: String,
}

impl ExecServiceClient {
    pub fn new(base_url: String, client_id: String, client_secret: String) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .expect("Failed to build reqwest client");

        Self {
            client,
            base_url,
            client_id,
            client_secret,
        }
    }

    /// Submit code for execution and return the service's response
    /// (stdout and run statistics) verbatim.
    pub async fn execute(
        &self,
        code: &str,
        language: &ExecLanguage,
        stdin: &str,
    ) -> Result<serde_json::Value, reqwest::Error> {
        let body = json!({
            "script": code,
            "language": language.name,
            "versionIndex": language.version,
            "clientId": self.client_id,
            "clientSecret": self.client_secret,
            "stdin": stdin,
        });
        self.client
            .post(&self.base_url)
            .json(&body)
            .send()
            .await?
            .json()
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_languages_resolve() {
        assert_eq!(lookup_language("python").unwrap().name, "python3");
        assert_eq!(lookup_language("c_cpp").unwrap().name, "cpp17");
        assert!(lookup_language("cobol").is_none());
    }
}
