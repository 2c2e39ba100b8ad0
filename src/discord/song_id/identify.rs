// `/identify` - name the song in an audio clip.

use crate::core::song_id::SongMatch;
use crate::discord::ui::{self, NEUTRAL_COLOR};
use crate::discord::{Context, Error};
use poise::serenity_prelude as serenity;

fn song_embed(song: &SongMatch) -> serenity::CreateEmbed {
    let mut embed = serenity::CreateEmbed::new()
        .title(&song.title)
        .description(format!("by **{}**", song.artist))
        .color(NEUTRAL_COLOR)
        .field("Album", song.album.as_deref().unwrap_or("N/A"), true)
        .field(
            "Released",
            song.release_date.as_deref().unwrap_or("N/A"),
            true,
        );
    if let Some(link) = &song.song_link {
        embed = embed.url(link).field("Listen", link, false);
    }
    embed
}

/// Identify a song from an audio file or link.
#[poise::command(slash_command)]
pub async fn identify(
    ctx: Context<'_>,
    #[description = "Link to an audio file"] url: Option<String>,
    #[description = "Audio file to identify"] file: Option<serenity::Attachment>,
) -> Result<(), Error> {
    let Some(audio_url) = file.map(|f| f.url).or(url) else {
        return ui::send_error(
            ctx,
            "Nothing to identify",
            "Attach an audio file or pass a link to one.",
        )
        .await;
    };

    ctx.defer().await?;

    match ctx.data().song_id.identify(&audio_url).await? {
        Some(song) => ui::send_embed(ctx, song_embed(&song)).await,
        None => {
            ui::send_embed(
                ctx,
                ui::error_embed("No match", "Couldn't recognize a song in that audio."),
            )
            .await
        }
    }
}
