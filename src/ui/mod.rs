/// Screen builders
///
/// Pure view code: everything here reads the studio state and produces
/// widgets; no mutation, no provider calls. The shell in main.rs decides
/// which screen to show.

use iced::widget::{button, column, container, image as picture, row, scrollable, stack, text};
use iced::{Alignment, Color, Element, Length};

use crate::images::ImageHandle;
use crate::state::pose;
use crate::state::studio::Studio;
use crate::Message;

/// Decoded-on-demand handle for the image widget.
fn picture_handle(image: &ImageHandle) -> picture::Handle {
    picture::Handle::from_bytes(image.bytes().to_vec())
}

/// Shown when the session gate is closed.
pub fn locked_screen<'a>() -> Element<'a, Message> {
    let content = column![
        text("Fit Studio").size(48),
        text("Sign in to start dressing your AI model.").size(16),
        button("Enter the studio")
            .on_press(Message::SignInGuest)
            .padding(12),
    ]
    .spacing(24)
    .align_x(Alignment::Center);

    container(content)
        .width(Length::Fill)
        .height(Length::Fill)
        .center_x(Length::Fill)
        .center_y(Length::Fill)
        .into()
}

/// The landing screen: upload a portrait, get a studio persona back.
pub fn start_screen<'a>(studio: &'a Studio, portrait: Option<&'a ImageHandle>) -> Element<'a, Message> {
    let mut content = column![
        text("Product Vision Perfected.").size(52),
        text(
            "Transform a standard portrait into studio-grade fashion photography, \
             then overlay your garments with realistic fabric physics."
        )
        .size(16),
    ]
    .spacing(24)
    .align_x(Alignment::Center);

    if let Some(image) = portrait {
        content = content.push(picture(picture_handle(image)).height(Length::Fixed(320.0)));
    }

    if studio.is_loading() {
        content = content.push(
            text(studio.loading_message().unwrap_or("Working...")).size(14),
        );
    } else {
        content = content.push(
            button("Upload Portrait")
                .on_press(Message::UploadPortrait)
                .padding(14),
        );
    }

    if let Some(message) = studio.error() {
        content = content.push(error_banner(message));
    }

    container(content)
        .width(Length::Fill)
        .height(Length::Fill)
        .center_x(Length::Fill)
        .center_y(Length::Fill)
        .padding(40)
        .into()
}

/// The dressing room: canvas on the left, outfit stack and wardrobe on the
/// right.
pub fn studio_screen(studio: &Studio) -> Element<'_, Message> {
    row![canvas_panel(studio), sidebar(studio)]
        .width(Length::Fill)
        .height(Length::Fill)
        .into()
}

fn canvas_panel(studio: &Studio) -> Element<'_, Message> {
    let shot: Element<Message> = match studio.displayed_image() {
        Some(image) => picture(picture_handle(image))
            .width(Length::Fill)
            .height(Length::Fill)
            .into(),
        None => container(text("Loading model...").size(16))
            .center_x(Length::Fill)
            .center_y(Length::Fill)
            .into(),
    };

    let busy = studio.is_loading();

    let actions = row![
        button("Start Over").on_press(Message::StartOver).padding(10),
        button("Download")
            .on_press_maybe(studio.displayed_image().map(|_| Message::Download))
            .padding(10),
        button("Sign Out")
            .on_press(Message::SignOut)
            .style(button::secondary)
            .padding(10),
    ]
    .spacing(12);

    let pose_controls = row![
        button("<")
            .on_press_maybe((!busy).then_some(Message::PreviousPose))
            .padding(10),
        text(pose::instruction(studio.pose_index())).size(14),
        button(">")
            .on_press_maybe((!busy).then_some(Message::NextPose))
            .padding(10),
    ]
    .spacing(16)
    .align_y(Alignment::Center);

    let mut panel = column![actions, shot, pose_controls, pose_menu(studio)]
        .spacing(16)
        .align_x(Alignment::Center)
        .width(Length::FillPortion(2))
        .height(Length::Fill)
        .padding(24);

    if busy {
        let overlay = container(
            text(studio.loading_message().unwrap_or("Working...")).size(18),
        )
        .width(Length::Fill)
        .height(Length::Fill)
        .center_x(Length::Fill)
        .center_y(Length::Fill)
        .style(|_theme| container::Style {
            background: Some(
                Color {
                    a: 0.85,
                    ..Color::WHITE
                }
                .into(),
            ),
            ..container::Style::default()
        });
        panel = column![stack![panel, overlay]]
            .width(Length::FillPortion(2))
            .height(Length::Fill);
    }

    panel.into()
}

/// One button per catalog pose; the current one and everything during a
/// generation are disabled. Poses already cached on the current layer are
/// marked, since selecting them is instant.
fn pose_menu(studio: &Studio) -> Element<'_, Message> {
    let busy = studio.is_loading();
    let current = studio.pose_index();
    let cached: Vec<usize> = studio
        .history()
        .current_layer()
        .map(|layer| layer.shots.pose_indexes().collect())
        .unwrap_or_default();

    let tiles: Vec<Element<Message>> = pose::INSTRUCTIONS
        .iter()
        .enumerate()
        .map(|(index, instruction)| {
            let selectable = !busy && index != current;
            let label = if cached.contains(&index) {
                format!("● {instruction}")
            } else {
                (*instruction).to_string()
            };
            button(text(label).size(12))
                .on_press_maybe(selectable.then_some(Message::PoseSelected(index)))
                .style(button::secondary)
                .padding(6)
                .into()
        })
        .collect();

    iced_aw::Wrap::with_elements(tiles)
        .spacing(6.0)
        .line_spacing(6.0)
        .into()
}

fn sidebar(studio: &Studio) -> Element<'_, Message> {
    let mut content = column![outfit_stack(studio), wardrobe_panel(studio)].spacing(32);

    if let Some(message) = studio.error() {
        content = content.push(error_banner(message));
    }

    container(scrollable(content.padding(24)))
        .width(Length::FillPortion(1))
        .height(Length::Fill)
        .into()
}

/// The visible outfit, base layer first; only the top garment is removable.
fn outfit_stack(studio: &Studio) -> Element<'_, Message> {
    let layers = studio.history().active_layers();
    let mut list = column![text("Current Look").size(24)].spacing(10);

    for (index, layer) in layers.iter().enumerate() {
        let name = layer
            .garment
            .as_ref()
            .map(|garment| garment.name.as_str())
            .unwrap_or("Your AI Model");

        let mut entry = row![
            text(format!("{}", index + 1)).size(13),
            text(name).size(15).width(Length::Fill),
        ]
        .spacing(12)
        .align_y(Alignment::Center);

        let removable = index > 0 && index == layers.len() - 1 && !studio.is_loading();
        if index > 0 && index == layers.len() - 1 {
            entry = entry.push(
                button(text("Remove").size(13))
                    .on_press_maybe(removable.then_some(Message::RemoveLastGarment))
                    .style(button::danger)
                    .padding(6),
            );
        }

        list = list.push(entry);
    }

    if layers.len() == 1 {
        list = list.push(text("Select garments below").size(13));
    }

    list.into()
}

/// Garment tiles plus the upload tile. Garments already on the model are
/// disabled, as is everything while a generation is in flight.
fn wardrobe_panel(studio: &Studio) -> Element<'_, Message> {
    let busy = studio.is_loading();
    let active = studio.active_garment_ids();

    let mut tiles: Vec<Element<Message>> = Vec::new();
    for garment in studio.wardrobe().iter() {
        let selectable = !busy && !active.contains(&garment.id.as_str());
        let tile = column![
            picture(picture_handle(&garment.image)).width(Length::Fixed(96.0)),
            text(garment.name.as_str()).size(12),
        ]
        .spacing(6)
        .align_x(Alignment::Center);

        tiles.push(
            button(tile)
                .on_press_maybe(selectable.then(|| Message::GarmentPicked(garment.id.clone())))
                .padding(8)
                .into(),
        );
    }

    tiles.push(
        button(text("Upload").size(14))
            .on_press_maybe((!busy).then_some(Message::UploadGarment))
            .padding(24)
            .into(),
    );

    column![
        text("Wardrobe").size(24),
        iced_aw::Wrap::with_elements(tiles)
            .spacing(10.0)
            .line_spacing(10.0),
    ]
    .spacing(10)
    .into()
}

fn error_banner(message: &str) -> Element<'_, Message> {
    container(text(message).size(14))
        .padding(16)
        .width(Length::Fill)
        .style(|_theme| container::Style {
            text_color: Some(Color::from_rgb8(185, 28, 28)),
            background: Some(Color::from_rgb8(254, 242, 242).into()),
            ..container::Style::default()
        })
        .into()
}
