use dioxus::prelude::*;
use dioxus_router::{Link, Outlet, Routable};

use crate::context::AppContext;
use crate::views::{AdminView, HomeView};

#[derive(Clone, Routable, PartialEq)]
#[rustfmt::skip]
pub enum Route {
    #[layout(Layout)]
        #[route("/", HomeView)] Home {},
        #[route("/admin", AdminView)] Admin {},
}

#[component]
fn Layout() -> Element {
    rsx! {
        div { class: "app",
            Navigation {}
            main { class: "content",
                Outlet::<Route> {}
            }
        }
    }
}

#[component]
fn Navigation() -> Element {
    let ctx = use_context::<AppContext>();

    rsx! {
        nav { class: "topbar",
            h1 { class: "brand", "{ctx.app_name()}" }
            div { class: "nav-links",
                Link { class: "nav-link", active_class: "active", to: Route::Home {}, "Home" }
                Link { class: "nav-link", active_class: "active", to: Route::Admin {}, "Admin" }
            }
        }
    }
}
