//! List the posts in the CMS repository

use anyhow::Result;

use crate::content::Post;
use crate::generator::PageBuilder;
use crate::helpers::parse_date;
use crate::pagination::Paginator;
use crate::Site;

/// Print every post, newest first
pub async fn run(site: &Site) -> Result<()> {
    let builder = site.page_builder()?;
    let posts = collect_posts(&builder).await?;

    println!("Posts ({}):", posts.len());
    for post in &posts {
        println!("  {}", describe(post));
    }

    Ok(())
}

/// Walk the listing page by page until the cursor runs out
pub async fn collect_posts(builder: &PageBuilder) -> Result<Vec<Post>> {
    let paginator = Paginator::new(builder.cms().clone(), builder.first_page(None).await?);
    let pages = paginator
        .load_all()
        .await
        .map_err(|outcome| anyhow::anyhow!("failed to load posts: {:?}", outcome))?;
    tracing::debug!(pages = pages + 1, "walked the listing");

    Ok(paginator.into_inner().results)
}

fn describe(post: &Post) -> String {
    let date = post
        .publication_date
        .as_deref()
        .and_then(|date| parse_date(date).ok())
        .map(|date| date.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "----------".to_string());
    format!("{} - {} [{}]", date, post.title, post.uid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cms::memory::{post_documents, MemoryCms};
    use crate::config::SiteConfig;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_collect_posts_walks_all_pages() {
        let builder = PageBuilder::new(
            Arc::new(MemoryCms::new(post_documents(5))),
            SiteConfig::default(),
        )
        .unwrap();

        let posts = collect_posts(&builder).await.unwrap();
        let uids: Vec<_> = posts.iter().map(|p| p.uid.as_str()).collect();
        assert_eq!(uids, ["post-5", "post-4", "post-3", "post-2", "post-1"]);
    }

    #[test]
    fn test_describe() {
        let mut post = Post {
            uid: "hooks".to_string(),
            publication_date: Some("2021-03-25T19:25:28+0000".to_string()),
            title: "Como utilizar Hooks".to_string(),
            subtitle: String::new(),
            author: String::new(),
        };
        assert_eq!(describe(&post), "2021-03-25 - Como utilizar Hooks [hooks]");

        post.publication_date = None;
        assert_eq!(describe(&post), "---------- - Como utilizar Hooks [hooks]");
    }
}
