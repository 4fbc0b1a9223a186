use serde_json::json;
use std::time::Instant;

const BASE_URL: &str = "http://127.0.0.1:3000";
const NUM_USERS: usize = 100;
const POSTS_PER_USER: usize = 2;

#[ignore]
#[tokio::test(flavor = "multi_thread")]
async fn perf_test_users_with_posts() {
    let client = reqwest::Client::new();
    let start = Instant::now();

    println!("\n=== Performance Test ===");
    println!("Creating {} users with {} posts each...", NUM_USERS, POSTS_PER_USER);

    let mut tokens = Vec::new();

    // Register users
    let registration_start = Instant::now();
    for i in 0..NUM_USERS {
        let tag = uuid::Uuid::new_v4().to_string()[..8].to_string();
        let resp = client
            .post(format!("{}/api/auth/register", BASE_URL))
            .json(&json!({
                "name": format!("Perf User {}", i),
                "username": format!("perf_{}_{}", i, tag),
                "email": format!("perf_{}@example.com", tag),
                "password": "password123"
            }))
            .send()
            .await;

        if let Ok(resp) = resp {
            if resp.status() == 201 {
                if let Ok(data) = resp.json::<serde_json::Value>().await {
                    if let Some(token) = data["token"].as_str() {
                        tokens.push(token.to_string());
                    }
                }
            }
        }

        if (i + 1) % 50 == 0 {
            println!("  Registered {}/{} users", i + 1, NUM_USERS);
        }
    }
    let registration_time = registration_start.elapsed();

    println!(
        "Registration done: {} users in {:.2}s ({:.2} users/sec)",
        tokens.len(),
        registration_time.as_secs_f64(),
        tokens.len() as f64 / registration_time.as_secs_f64()
    );

    // Create posts
    let post_creation_start = Instant::now();
    let mut posts_created = 0;
    let mut posts_failed = 0;

    for (idx, token) in tokens.iter().enumerate() {
        for post_num in 0..POSTS_PER_USER {
            let content = format!(
                "Post {} from user {} - perf run at {}",
                post_num + 1,
                idx,
                chrono::Utc::now().to_rfc3339()
            );

            let resp = client
                .post(format!("{}/api/posts", BASE_URL))
                .header("Authorization", format!("Bearer {}", token))
                .json(&json!({ "content": content }))
                .send()
                .await;

            match resp {
                Ok(resp) if resp.status() == 201 => posts_created += 1,
                _ => posts_failed += 1,
            }
        }

        if (idx + 1) % 50 == 0 {
            println!(
                "  Processed {}/{} users ({} posts created)",
                idx + 1,
                tokens.len(),
                posts_created
            );
        }
    }
    let post_creation_time = post_creation_start.elapsed();

    // One feed fetch to measure read-side cost after the write load
    let feed_start = Instant::now();
    let feed_resp = client
        .get(format!("{}/api/posts?page=1&limit=10", BASE_URL))
        .header("Authorization", format!("Bearer {}", tokens[0]))
        .send()
        .await;
    let feed_time = feed_start.elapsed();

    let total_time = start.elapsed();
    let total_requests = tokens.len() + posts_created + posts_failed;

    println!("\n=== Results ===");
    println!("Total time: {:.2}s", total_time.as_secs_f64());
    println!("Registration: {:.2}s", registration_time.as_secs_f64());
    println!("Post creation: {:.2}s", post_creation_time.as_secs_f64());
    println!("Users created: {}", tokens.len());
    println!("Posts created: {}", posts_created);
    println!("Posts failed: {}", posts_failed);
    println!("Feed fetch: {:.2}ms", feed_time.as_millis());
    if let Ok(resp) = feed_resp {
        println!("Feed fetch status: {}", resp.status());
    }
    println!(
        "Avg time per request: {:.2}ms",
        (total_time.as_secs_f64() * 1000.0) / total_requests as f64
    );
    println!(
        "Throughput: {:.0} requests/sec",
        total_requests as f64 / total_time.as_secs_f64()
    );
}
