//! Smoke test against the OpenAI Responses API (needs OPENAI_API_KEY)

use log::{error, info};
use batchcall::{BatchClient, BatchConfig, Message, OpenAiProvider, RequestOptions};

const DEFAULT_MODEL: &str = "gpt-4.1-mini";

#[tokio::main]
async fn main()
{   env_logger::init();

    let provider = match OpenAiProvider::from_env()
    {   Ok(p) => p
      , Err(e) => {
          error!("{}", e);
          std::process::exit(1);
        }
    };
    let model = std::env::var("BATCHCALL_MODEL")
      .unwrap_or_else(|_| DEFAULT_MODEL.to_string());

    let client = BatchClient::new(
      provider
    , BatchConfig::default()
        .with_max_concurrency(5)
        .with_qps(2.0)
    );
    let prompts: Vec<Vec<Message>> = (0..5)
      .map(|i| vec![Message::user(format!(
        "Respond with the number {} squared only.", i
      ))])
      .collect();

    info!("Sending {} prompts to {}", prompts.len(), model);
    let responses = client
      .execute_batch(prompts, &model, &RequestOptions::default())
      .await;

    for (i, resp) in responses.iter().enumerate()
    {   match &resp.error
        {   None => println!("{}: {}", i, resp.content)
          , Some(e) => println!("{}: error: {}", i, e)
        }
    }
}
