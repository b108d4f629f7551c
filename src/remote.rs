//! Read-only client for a hosted PostgREST backend (the `/rest/v1` API).

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::dao::{BenefitRow, CategoryRow, CourseRow, FeatureRow, LessonRow, SectionRow, TestimonialRow};
use crate::source::CatalogSource;

pub struct RestClient {
    base: Url,
    api_key: String,
    http: reqwest::Client,
    name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct CategoryName {
    name: Option<String>,
}

/// Course as PostgREST returns it for `select=*,categories(name)`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct RestCourse {
    id: String,
    title: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    image_url: Option<String>,
    #[serde(default)]
    instructor_id: Option<String>,
    #[serde(default)]
    instructor_name: Option<String>,
    #[serde(default)]
    price: Option<f64>,
    #[serde(default)]
    original_price: Option<f64>,
    #[serde(default)]
    rating: Option<f64>,
    #[serde(default)]
    students_count: Option<i64>,
    #[serde(default)]
    category_id: Option<String>,
    #[serde(default)]
    categories: Option<CategoryName>,
    #[serde(default)]
    level: Option<String>,
    #[serde(default)]
    duration: Option<String>,
    #[serde(default)]
    bestseller: Option<bool>,
    #[serde(default)]
    featured: Option<bool>,
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default)]
    updated_at: Option<String>,
}

impl From<RestCourse> for CourseRow {
    fn from(c: RestCourse) -> Self {
        CourseRow {
            id: c.id,
            title: c.title,
            description: c.description,
            image_url: c.image_url,
            instructor_id: c.instructor_id,
            instructor_name: c.instructor_name,
            price: c.price,
            original_price: c.original_price,
            rating: c.rating,
            students_count: c.students_count,
            category_id: c.category_id,
            category_name: c.categories.and_then(|j| j.name),
            level: c.level,
            duration: c.duration,
            bestseller: c.bestseller,
            featured: c.featured,
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct RestLesson {
    id: String,
    section_id: String,
    title: String,
    #[serde(default)]
    duration: Option<String>,
    #[serde(default)]
    is_free: Option<bool>,
    order_index: i64,
    #[serde(default)]
    video_url: Option<String>,
    #[serde(default)]
    content: Option<String>,
}

impl From<RestLesson> for LessonRow {
    fn from(l: RestLesson) -> Self {
        LessonRow {
            id: l.id,
            section_id: l.section_id,
            title: l.title,
            duration: l.duration,
            is_free: l.is_free,
            order_index: l.order_index,
            video_url: l.video_url,
            content: l.content,
        }
    }
}

impl RestClient {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self> {
        let mut base = Url::parse(base_url).with_context(|| format!("invalid backend URL: {base_url}"))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let name = base.host_str().unwrap_or("remote").to_string();
        let http = reqwest::Client::builder()
            .user_agent(concat!("coursehub/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { base, api_key: api_key.to_string(), http, name })
    }

    /// `{base}rest/v1/{table}?{query}`
    pub fn table_url(&self, table: &str, query: &[(&str, &str)]) -> Result<Url> {
        let mut url = self.base.join(&format!("rest/v1/{table}"))?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    async fn get<T: DeserializeOwned>(&self, table: &str, query: &[(&str, &str)]) -> Result<Vec<T>> {
        let url = self.table_url(table, query)?;
        debug!(%url, "backend request");
        let resp = self
            .http
            .get(url.clone())
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .header("Accept", "application/json")
            .send()
            .await
            .with_context(|| format!("request to {url} failed"))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            bail!("backend returned {status} for {table}: {body}");
        }
        resp.json::<Vec<T>>().await.with_context(|| format!("decoding {table} response"))
    }
}

#[async_trait]
impl CatalogSource for RestClient {
    fn name(&self) -> &str { &self.name }

    async fn fetch_courses(&self) -> Result<Vec<CourseRow>> {
        let rows: Vec<RestCourse> = self
            .get("courses", &[("select", "*,categories(name)"), ("order", "created_at.desc")])
            .await?;
        Ok(rows.into_iter().map(CourseRow::from).collect())
    }

    async fn fetch_course(&self, course_id: &str) -> Result<Option<CourseRow>> {
        let filter = format!("eq.{course_id}");
        let rows: Vec<RestCourse> = self
            .get("courses", &[("select", "*,categories(name)"), ("id", filter.as_str()), ("limit", "1")])
            .await?;
        Ok(rows.into_iter().next().map(CourseRow::from))
    }

    async fn fetch_categories(&self) -> Result<Vec<CategoryRow>> {
        self.get("categories", &[("select", "id,name"), ("order", "name.asc")]).await
    }

    async fn fetch_curriculum(&self, course_id: &str) -> Result<(Vec<SectionRow>, Vec<LessonRow>)> {
        let filter = format!("eq.{course_id}");
        let sections: Vec<SectionRow> = self
            .get("course_sections", &[("select", "id,course_id,title,order_index"), ("course_id", filter.as_str()), ("order", "order_index.asc")])
            .await?;
        if sections.is_empty() {
            return Ok((sections, Vec::new()));
        }
        let ids = sections.iter().map(|s| s.id.as_str()).collect::<Vec<_>>().join(",");
        let in_filter = format!("in.({ids})");
        let lessons: Vec<RestLesson> = self
            .get("course_lessons", &[("select", "*"), ("section_id", in_filter.as_str()), ("order", "order_index.asc")])
            .await?;
        Ok((sections, lessons.into_iter().map(LessonRow::from).collect()))
    }

    async fn fetch_testimonials(&self, course_id: Option<&str>) -> Result<Vec<TestimonialRow>> {
        let select = ("select", "id,name,role,content,rating,avatar_url,course_id");
        let order = ("order", "created_at.desc");
        match course_id {
            Some(id) => {
                let filter = format!("eq.{id}");
                self.get("testimonials", &[select, ("course_id", filter.as_str()), order]).await
            }
            None => self.get("testimonials", &[select, order]).await,
        }
    }

    async fn fetch_features(&self) -> Result<Vec<FeatureRow>> {
        self.get("features", &[("select", "id,title,description,icon"), ("order", "created_at.asc")]).await
    }

    async fn fetch_benefits(&self) -> Result<Vec<BenefitRow>> {
        self.get("benefits", &[("select", "id,title,description,color"), ("order", "created_at.asc")]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_urls_keep_base_path_and_encode_filters() {
        let c = RestClient::new("https://abc.example.co/api", "key").unwrap();
        let url = c.table_url("courses", &[("select", "*,categories(name)"), ("id", "eq.42")]).unwrap();
        assert_eq!(url.path(), "/api/rest/v1/courses");
        let pairs: Vec<(String, String)> = url.query_pairs().map(|(k, v)| (k.into_owned(), v.into_owned())).collect();
        assert_eq!(pairs, [("select".to_string(), "*,categories(name)".to_string()), ("id".to_string(), "eq.42".to_string())]);
        assert_eq!(c.name(), "abc.example.co");
    }

    #[test]
    fn rejects_malformed_base_url() {
        assert!(RestClient::new("not a url", "key").is_err());
    }

    #[test]
    fn joined_category_name_is_flattened() {
        let json = r#"[{"id":"c1","title":"Rust","price":null,"bestseller":true,"categories":{"name":"Development"}},
                       {"id":"c2","title":"Go","categories":null}]"#;
        let rows: Vec<RestCourse> = serde_json::from_str(json).unwrap();
        let rows: Vec<CourseRow> = rows.into_iter().map(CourseRow::from).collect();
        assert_eq!(rows[0].category_name.as_deref(), Some("Development"));
        assert_eq!(rows[0].bestseller, Some(true));
        assert_eq!(rows[0].price, None);
        assert_eq!(rows[1].category_name, None);
    }
}
