// src/common/extract.rs

use std::collections::HashMap;

use axum::{
    body::Bytes,
    extract::{FromRequest, FromRequestParts, Multipart, Path, Query, Request},
    http::request::Parts,
    Json,
};
use serde::de::DeserializeOwned;

use crate::common::error::AppError;

// ---
// JSON com rejeição no formato da API
// ---

/// `Json<T>` cuja rejeição vira `AppError::Validation` (400 no envelope padrão)
/// em vez do texto puro do axum.
pub struct AppJson<T>(pub T);

impl<S, T> FromRequest<S> for AppJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| AppError::Validation(rejection.body_text()))?;
        Ok(AppJson(value))
    }
}

/// `Path<T>`: id mal formado na URL também responde no envelope.
pub struct AppPath<T>(pub T);

impl<S, T> FromRequestParts<S> for AppPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| AppError::Validation(rejection.body_text()))?;
        Ok(AppPath(value))
    }
}

pub struct AppQuery<T>(pub T);

impl<S, T> FromRequestParts<S> for AppQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| AppError::Validation(rejection.body_text()))?;
        Ok(AppQuery(value))
    }
}

/// Corpo JSON opcional: corpo vazio vira `T::default()`.
pub fn parse_optional_body<T>(body: &Bytes) -> Result<T, AppError>
where
    T: DeserializeOwned + Default,
{
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|e| AppError::Validation(format!("Invalid JSON body: {e}")))
}

// ---
// Formulários multipart
// ---

#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub field: String,
    pub file_name: String,
    pub content_type: Option<String>,
    pub data: Bytes,
}

/// Multipart já lido para memória: campos de texto + arquivos.
#[derive(Debug, Default)]
pub struct FormData {
    fields: HashMap<String, String>,
    files: Vec<UploadedFile>,
}

impl<S> FromRequest<S> for FormData
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(|rejection| AppError::Validation(rejection.body_text()))?;

        let mut form = FormData::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::Validation(e.body_text()))?
        {
            let name = field.name().unwrap_or_default().to_string();

            match field.file_name().map(str::to_string) {
                Some(file_name) => {
                    let content_type = field.content_type().map(str::to_string);
                    let data = field
                        .bytes()
                        .await
                        .map_err(|e| AppError::Validation(e.body_text()))?;

                    // Input de arquivo vazio no navegador
                    if file_name.is_empty() && data.is_empty() {
                        continue;
                    }

                    form.files.push(UploadedFile {
                        field: name,
                        file_name,
                        content_type,
                        data,
                    });
                }
                None => {
                    let value = field
                        .text()
                        .await
                        .map_err(|e| AppError::Validation(e.body_text()))?;
                    form.fields.insert(name, value);
                }
            }
        }

        Ok(form)
    }
}

impl FormData {
    pub fn insert(&mut self, key: &str, value: &str) {
        self.fields.insert(key.to_string(), value.to_string());
    }

    pub fn push_file(&mut self, file: UploadedFile) {
        self.files.push(file);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// Valor de texto, `None` se ausente ou em branco.
    pub fn text(&self, key: &str) -> Option<&str> {
        self.fields
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    pub fn text_or_default(&self, key: &str) -> String {
        self.text(key).unwrap_or_default().to_string()
    }

    /// Nomes dos campos obrigatórios ausentes, na ordem pedida.
    pub fn missing<'a>(&self, required: &[&'a str]) -> Vec<&'a str> {
        required
            .iter()
            .copied()
            .filter(|key| self.text(key).is_none())
            .collect()
    }

    pub fn flag(&self, key: &str) -> bool {
        self.text(key)
            .map(|v| v.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    }

    pub fn take_file(&mut self, field: &str) -> Option<UploadedFile> {
        let index = self.files.iter().position(|f| f.field == field)?;
        Some(self.files.remove(index))
    }

    pub fn take_files(&mut self, field: &str) -> Vec<UploadedFile> {
        let (taken, rest): (Vec<_>, Vec<_>) =
            std::mem::take(&mut self.files).into_iter().partition(|f| f.field == field);
        self.files = rest;
        taken
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use serde::Deserialize;

    fn multipart_request(body: &str) -> Request {
        axum::http::Request::builder()
            .method("POST")
            .uri("/")
            .header("content-type", "multipart/form-data; boundary=XBOUNDARY")
            .body(Body::from(body.replace('\n', "\r\n")))
            .unwrap()
    }

    #[tokio::test]
    async fn multipart_fields_and_files_are_split() {
        let body = "--XBOUNDARY
Content-Disposition: form-data; name=\"title\"

Website revamp
--XBOUNDARY
Content-Disposition: form-data; name=\"receipt\"; filename=\"paid.pdf\"
Content-Type: application/pdf

PDFDATA
--XBOUNDARY
Content-Disposition: form-data; name=\"files\"; filename=\"\"
Content-Type: application/octet-stream


--XBOUNDARY--
";
        let mut form = FormData::from_request(multipart_request(body), &())
            .await
            .unwrap();

        assert_eq!(form.text("title"), Some("Website revamp"));
        let receipt = form.take_file("receipt").unwrap();
        assert_eq!(receipt.file_name, "paid.pdf");
        assert_eq!(receipt.content_type.as_deref(), Some("application/pdf"));
        assert_eq!(&receipt.data[..], b"PDFDATA");
        assert!(form.take_files("files").is_empty());
    }

    #[tokio::test]
    async fn non_multipart_request_is_a_validation_error() {
        let req = axum::http::Request::builder()
            .method("POST")
            .uri("/")
            .header("content-type", "application/json")
            .body(Body::from("{}"))
            .unwrap();

        let err = FormData::from_request(req, &()).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn missing_reports_blank_and_absent_fields_in_order() {
        let mut form = FormData::default();
        form.insert("title", "Deal");
        form.insert("budget", "   ");

        assert_eq!(
            form.missing(&["title", "client_name", "budget"]),
            vec!["client_name", "budget"]
        );
        assert!(form.contains("budget"));
    }

    #[test]
    fn flag_is_case_insensitive() {
        let mut form = FormData::default();
        form.insert("is_multiproject", "TRUE");
        assert!(form.flag("is_multiproject"));
        assert!(!form.flag("absent"));
    }

    #[derive(Debug, Default, Deserialize, PartialEq)]
    struct SubmitBody {
        username: Option<String>,
    }

    #[test]
    fn empty_optional_body_uses_default() {
        let parsed: SubmitBody = parse_optional_body(&Bytes::from_static(b"  ")).unwrap();
        assert_eq!(parsed, SubmitBody::default());

        let parsed: SubmitBody =
            parse_optional_body(&Bytes::from_static(br#"{"username":"ana"}"#)).unwrap();
        assert_eq!(parsed.username.as_deref(), Some("ana"));

        assert!(parse_optional_body::<SubmitBody>(&Bytes::from_static(b"{")).is_err());
    }
}
