use serde::Deserialize;
use std::error::Error;
use std::path::Path;
use std::time::Duration;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
struct UploadResponse {
    job_id: Uuid,
}

#[derive(Debug, Deserialize)]
struct JobStatusResponse {
    state: String,
    model_url: Option<String>,
    error: Option<JobFailure>,
}

#[derive(Debug, Deserialize)]
struct JobFailure {
    kind: String,
    message: String,
}

pub struct ClientCli {
    inner: reqwest::Client,
    base_url: String,
}

impl ClientCli {
    pub fn new(base_url: &str) -> Self {
        Self {
            inner: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub async fn submit(&self, file: &Path) -> Result<(), Box<dyn Error>> {
        let bytes = tokio::fs::read(file).await?;
        let file_name = file
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "blueprint".to_string());
        let part = reqwest::multipart::Part::bytes(bytes).file_name(file_name);
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .inner
            .post(format!("{}/upload", self.base_url))
            .multipart(form)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(format!("server refused the upload: {}", response.text().await?).into());
        }
        let UploadResponse { job_id } = response.json().await?;
        println!("Submitted job id: {}", job_id);
        Ok(())
    }

    pub async fn status(&self, job_id: Uuid) -> Result<(), Box<dyn Error>> {
        let status = self.fetch_status(job_id).await?;
        match status.state.as_str() {
            "queued" => println!("Queued"),
            "running" => println!("Running"),
            "succeeded" => println!(
                "Succeeded: {}",
                status.model_url.as_deref().unwrap_or("<missing model url>")
            ),
            "failed" => match &status.error {
                Some(failure) => println!("Failed ({}): {}", failure.kind, failure.message),
                None => println!("Failed"),
            },
            other => println!("{}", other),
        }
        Ok(())
    }

    pub async fn cancel(&self, job_id: Uuid) -> Result<(), Box<dyn Error>> {
        let response = self
            .inner
            .delete(format!("{}/jobs/{}", self.base_url, job_id))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(format!("cancel failed: {}", response.text().await?).into());
        }
        println!("Cancellation requested for {}", job_id);
        Ok(())
    }

    pub async fn download(&self, job_id: Uuid, out: &Path) -> Result<(), Box<dyn Error>> {
        loop {
            let status = self.fetch_status(job_id).await?;
            match status.state.as_str() {
                "succeeded" => {
                    let model_url = status
                        .model_url
                        .ok_or("server reported success without a model url")?;
                    let url = if model_url.starts_with("http") {
                        model_url
                    } else {
                        format!("{}{}", self.base_url, model_url)
                    };
                    let model = self
                        .inner
                        .get(url)
                        .send()
                        .await?
                        .error_for_status()?
                        .bytes()
                        .await?;
                    tokio::fs::write(out, &model).await?;
                    println!("Saved {} bytes to {}", model.len(), out.display());
                    return Ok(());
                }
                "failed" => {
                    let reason = status
                        .error
                        .map(|failure| failure.message)
                        .unwrap_or_else(|| "unknown failure".to_string());
                    return Err(format!("job failed: {reason}").into());
                }
                _ => tokio::time::sleep(Duration::from_millis(500)).await,
            }
        }
    }

    async fn fetch_status(&self, job_id: Uuid) -> Result<JobStatusResponse, Box<dyn Error>> {
        let response = self
            .inner
            .get(format!("{}/jobs/{}", self.base_url, job_id))
            .send()
            .await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err("no such job".into());
        }
        Ok(response.error_for_status()?.json().await?)
    }
}
