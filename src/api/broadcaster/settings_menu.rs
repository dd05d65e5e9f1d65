//! the "Broadcaster Settings" menu.

use tracing::info;
use tracing::warn;

use crate::api::collaborators::prompt::input_until_valid;
use crate::api::collaborators::prompt::Menu;
use crate::api::collaborators::prompt::Notice;
use crate::application::session::SessionContext;
use crate::models::address;

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
enum SettingsAction {
    #[strum(to_string = "List Broadcasters")]
    List,
    #[strum(to_string = "Add Broadcaster")]
    Add,
    #[strum(to_string = "Remove Broadcaster")]
    Remove,
    #[strum(to_string = "Back")]
    Back,
}

/// Shows the custom broadcaster menu until the user goes back.
///
/// Every change is persisted before it is reported, then forwarded to the
/// broadcaster network as the new preference list.
pub async fn run_settings_menu(ctx: &SessionContext) {
    loop {
        let pinned = ctx.custom_broadcasters.lock().await.addresses().len();
        let menu = Menu::new("Broadcaster Settings")
            .header(format!("{} custom broadcaster(s)", pinned))
            .entry(SettingsAction::List, SettingsAction::List.to_string(), None, pinned > 0)
            .choice(SettingsAction::Add, SettingsAction::Add.to_string())
            .entry(
                SettingsAction::Remove,
                SettingsAction::Remove.to_string(),
                None,
                pinned > 0,
            )
            .choice(SettingsAction::Back, SettingsAction::Back.to_string());

        match menu.run(ctx.prompter()).await {
            Some(SettingsAction::List) => list(ctx).await,
            Some(SettingsAction::Add) => add(ctx).await,
            Some(SettingsAction::Remove) => remove(ctx).await,
            Some(SettingsAction::Back) | None => return,
        }
    }
}

async fn list(ctx: &SessionContext) {
    let text = ctx
        .custom_broadcasters
        .lock()
        .await
        .addresses()
        .iter()
        .map(|a| format!("  {}", a))
        .collect::<Vec<_>>()
        .join("\n");
    ctx.prompter()
        .notify(Notice::Info, &format!("Custom broadcasters:\n{}", text));
}

async fn add(ctx: &SessionContext) {
    let Some(broadcaster) = input_until_valid(
        ctx.prompter(),
        "Broadcaster address (0zk...)",
        None,
        |raw| {
            let raw = raw.trim();
            if address::is_shielded_address(raw) {
                Ok(raw.to_string())
            } else {
                Err(format!(
                    "{} is not a shielded address",
                    address::shorten(raw)
                ))
            }
        },
    )
    .await
    else {
        return;
    };

    let result = ctx.custom_broadcasters.lock().await.add(&broadcaster).await;
    match result {
        Ok(()) => {
            ctx.prompter().notify(
                Notice::Success,
                &format!("Added broadcaster {}", address::shorten(&broadcaster)),
            );
            publish_preferences(ctx).await;
        }
        Err(e) => {
            warn!("could not add broadcaster: {}", e);
            ctx.prompter().notify(Notice::Error, &e.to_string());
        }
    }
}

async fn remove(ctx: &SessionContext) {
    let addresses = ctx.custom_broadcasters.lock().await.addresses().to_vec();
    let menu = addresses
        .iter()
        .fold(Menu::new("Remove which broadcaster?"), |menu, a| {
            menu.choice(Some(a.clone()), address::shorten(a))
        })
        .choice(None, "Back");
    let Some(Some(broadcaster)) = menu.run(ctx.prompter()).await else {
        return;
    };

    let result = ctx
        .custom_broadcasters
        .lock()
        .await
        .remove(&broadcaster)
        .await;
    match result {
        Ok(()) => {
            ctx.prompter().notify(
                Notice::Success,
                &format!("Removed broadcaster {}", address::shorten(&broadcaster)),
            );
            publish_preferences(ctx).await;
        }
        Err(e) => {
            warn!("could not remove broadcaster: {}", e);
            ctx.prompter().notify(Notice::Error, &e.to_string());
        }
    }
}

/// forwards the pinned list to the broadcaster network
pub async fn publish_preferences(ctx: &SessionContext) {
    let addresses = ctx.custom_broadcasters.lock().await.addresses().to_vec();
    info!("preferring {} custom broadcaster(s)", addresses.len());
    ctx.collaborators
        .relay
        .set_preferred_broadcasters(&addresses)
        .await;
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use macro_rules_attr::apply;

    use super::*;
    use crate::api::broadcaster::CustomBroadcasters;
    use crate::tests::shared::fixtures;
    use crate::tests::shared::prompter::Step;
    use crate::tests::shared_tokio_runtime;

    #[apply(shared_tokio_runtime)]
    async fn added_broadcaster_is_persisted_and_preferred() {
        let session = fixtures::session(vec![
            Step::select("Add Broadcaster"),
            Step::input("0xnot-shielded"),
            Step::input(fixtures::BROADCASTER_ADDRESS),
            Step::select("Back"),
        ]);

        run_settings_menu(&session.ctx).await;

        let path = session
            .ctx
            .custom_broadcasters
            .lock()
            .await
            .path()
            .to_path_buf();
        let reloaded = CustomBroadcasters::load(path).await;
        assert_eq!(vec![fixtures::BROADCASTER_ADDRESS], reloaded.addresses());
        assert_eq!(
            vec![fixtures::BROADCASTER_ADDRESS.to_string()],
            session.relay.preferred()
        );
        assert_eq!(1, session.prompter.notices_at(Notice::Warning).len());
    }

    #[apply(shared_tokio_runtime)]
    async fn removing_the_last_broadcaster_disables_remove() {
        let session = fixtures::session(vec![
            Step::select("Remove Broadcaster"),
            Step::select(&address::shorten(fixtures::BROADCASTER_ADDRESS)),
            Step::select("Back"),
        ]);
        session
            .ctx
            .custom_broadcasters
            .lock()
            .await
            .add(fixtures::BROADCASTER_ADDRESS)
            .await
            .unwrap();

        run_settings_menu(&session.ctx).await;

        assert!(session
            .ctx
            .custom_broadcasters
            .lock()
            .await
            .addresses()
            .is_empty());
        assert!(session.relay.preferred().is_empty());

        let last_menu = session.prompter.menus_seen().pop().unwrap();
        assert_eq!("0 custom broadcaster(s)", last_menu.header.unwrap());
        assert!(!last_menu.choices[2].enabled);
    }

    #[apply(shared_tokio_runtime)]
    async fn duplicate_broadcaster_is_rejected() {
        let session = fixtures::session(vec![
            Step::select("Add Broadcaster"),
            Step::input(fixtures::BROADCASTER_ADDRESS),
            Step::select("Back"),
        ]);
        session
            .ctx
            .custom_broadcasters
            .lock()
            .await
            .add(fixtures::BROADCASTER_ADDRESS)
            .await
            .unwrap();

        run_settings_menu(&session.ctx).await;

        assert_eq!(1, session.prompter.notices_at(Notice::Error).len());
        assert!(session.relay.preferred().is_empty());
    }
}
