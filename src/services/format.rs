use crate::services::localization::LocalizationManager;
use chrono::{DateTime, Utc};
use fluent::FluentArgs;

/// Inviter identity and ledger total, available when a join/leave could be
/// attributed to an inviter.
#[derive(Debug, Clone)]
pub struct InviterContext {
    pub mention: String,
    pub tag: String,
    pub name: String,
    pub id: String,
    pub invites: i64,
}

/// Metadata of the invite link that was used, when known.
#[derive(Debug, Clone)]
pub struct InviteContext {
    pub code: String,
    pub uses: i64,
    pub url: String,
    pub channel_mention: String,
}

/// Structured event data fed into notification templates.
#[derive(Debug, Clone, Default)]
pub struct MessageContext {
    pub user_mention: String,
    pub user_name: String,
    pub user_tag: String,
    pub user_id: String,
    /// Pre-rendered relative time ("3 days ago"); locale handling happens
    /// in the caller, the substitution itself is locale-independent.
    pub user_created_at: String,
    pub guild_name: String,
    pub guild_count: String,
    pub inviter: Option<InviterContext>,
    pub invite: Option<InviteContext>,
    pub num_joins: Option<u64>,
}

/// Substitute the placeholder vocabulary into a notification template.
///
/// Placeholders with no data in the context (for example `{inviter.tag}` on
/// a vanity join) and unknown placeholders are left verbatim.
pub fn format_message(template: &str, context: &MessageContext) -> String {
    let mut message = template
        .replace("{user.name}", &context.user_name)
        .replace("{user.tag}", &context.user_tag)
        .replace("{user.createdat}", &context.user_created_at)
        .replace("{user.id}", &context.user_id)
        .replace("{user}", &context.user_mention)
        .replace("{guild.count}", &context.guild_count)
        .replace("{guild}", &context.guild_name);

    if let Some(inviter) = &context.inviter {
        message = message
            .replace("{inviter.tag}", &inviter.tag)
            .replace("{inviter.name}", &inviter.name)
            .replace("{inviter.id}", &inviter.id)
            .replace("{inviter.invites}", &inviter.invites.to_string())
            .replace("{inviter}", &inviter.mention);
    }

    if let Some(invite) = &context.invite {
        message = message
            .replace("{invite.code}", &invite.code)
            .replace("{invite.uses}", &invite.uses.to_string())
            .replace("{invite.url}", &invite.url)
            .replace("{invite.channel}", &invite.channel_mention);
    }

    if let Some(num_joins) = context.num_joins {
        message = message.replace("{numJoins}", &num_joins.to_string());
    }

    message
}

/// Render "N days ago" for the given locale through fluent.
pub fn humanize_since(when: DateTime<Utc>, locale: &str, l10n: &LocalizationManager) -> String {
    let days = (Utc::now() - when).num_days().max(0);

    let mut args = FluentArgs::new();
    args.set("days", days);
    l10n.translate(locale, "time-days-ago", Some(&args))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> MessageContext {
        MessageContext {
            user_mention: "<@1>".to_string(),
            user_name: "alice".to_string(),
            user_tag: "alice#0001".to_string(),
            user_id: "1".to_string(),
            user_created_at: "3 days ago".to_string(),
            guild_name: "Rustaceans".to_string(),
            guild_count: "250".to_string(),
            inviter: Some(InviterContext {
                mention: "<@2>".to_string(),
                tag: "bob#0002".to_string(),
                name: "bob".to_string(),
                id: "2".to_string(),
                invites: -2,
            }),
            invite: Some(InviteContext {
                code: "abc123".to_string(),
                uses: 7,
                url: "https://discord.gg/abc123".to_string(),
                channel_mention: "<#3>".to_string(),
            }),
            num_joins: Some(2),
        }
    }

    #[test]
    fn test_substitutes_all_placeholders() {
        let out = format_message(
            "{user} ({user.tag}, made {user.createdat}) joined {guild} as member {guild.count}, \
             invited by {inviter} via {invite.code} ({invite.uses} uses), join #{numJoins}",
            &context(),
        );

        assert_eq!(
            out,
            "<@1> (alice#0001, made 3 days ago) joined Rustaceans as member 250, \
             invited by <@2> via abc123 (7 uses), join #2"
        );
    }

    #[test]
    fn test_negative_invite_counts_render_unclamped() {
        let out = format_message("{inviter.name} has {inviter.invites} invites", &context());
        assert_eq!(out, "bob has -2 invites");
    }

    #[test]
    fn test_unknown_placeholders_left_verbatim() {
        let out = format_message("{user.name} {not.a.placeholder}", &context());
        assert_eq!(out, "alice {not.a.placeholder}");
    }

    #[test]
    fn test_num_joins_placeholder_left_when_unknown() {
        // Leave notifications carry no join count.
        let mut ctx = context();
        ctx.num_joins = None;

        let out = format_message("{user.name} join #{numJoins}", &ctx);
        assert_eq!(out, "alice join #{numJoins}");
    }

    #[test]
    fn test_inviter_placeholders_left_without_inviter() {
        let mut ctx = context();
        ctx.inviter = None;

        let out = format_message("{user.name} invited by {inviter.tag}", &ctx);
        assert_eq!(out, "alice invited by {inviter.tag}");
    }

    #[test]
    fn test_longest_placeholder_wins_over_prefix() {
        // {user} is a prefix of {user.name}; substitution order must not
        // mangle the longer form.
        let out = format_message("{user} vs {user.name}", &context());
        assert_eq!(out, "<@1> vs alice");
    }
}
