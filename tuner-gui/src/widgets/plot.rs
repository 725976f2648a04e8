//! # Plot Widget
//!
//! Replays a [`DisplayList`] recorded by the visualization loop onto an iced
//! canvas. The canvas is sized to the list's declared dimensions, so the
//! recorded coordinates are used as-is.

use iced::widget::canvas::{self, Geometry, Stroke, path};
use iced::widget::container;
use iced::{Color, Element, Length, Point, Rectangle, Renderer, Theme, mouse};
use tuner_core::{DisplayList, PathCommand, Surface};

/// A plot of one recorded frame.
pub struct Plot<'a> {
    list: &'a DisplayList,
}

impl<'a> Plot<'a> {
    pub fn new(list: &'a DisplayList) -> Self {
        Self { list }
    }

    pub fn view(self) -> Element<'a, crate::Message> {
        let (width, height) = (self.list.width(), self.list.height());
        container(
            canvas::Canvas::new(self)
                .width(Length::Fixed(width))
                .height(Length::Fixed(height)),
        )
        .into()
    }
}

impl<Message> canvas::Program<Message> for Plot<'_> {
    type State = ();

    fn draw(
        &self,
        _state: &Self::State,
        renderer: &Renderer,
        _theme: &Theme,
        bounds: Rectangle,
        _cursor: mouse::Cursor,
    ) -> Vec<Geometry> {
        let mut frame = canvas::Frame::new(renderer, bounds.size());
        let mut builder: Option<path::Builder> = None;

        for command in self.list.commands() {
            match *command {
                PathCommand::Clear => {
                    frame.fill_rectangle(Point::ORIGIN, frame.size(), Color::WHITE);
                }
                PathCommand::BeginPath => builder = Some(path::Builder::new()),
                PathCommand::MoveTo(x, y) => {
                    if let Some(b) = builder.as_mut() {
                        b.move_to(Point::new(x, y));
                    }
                }
                PathCommand::LineTo(x, y) => {
                    if let Some(b) = builder.as_mut() {
                        b.line_to(Point::new(x, y));
                    }
                }
                PathCommand::Stroke => {
                    if let Some(b) = builder.take() {
                        frame.stroke(
                            &b.build(),
                            Stroke::default().with_width(1.0).with_color(Color::BLACK),
                        );
                    }
                }
            }
        }

        vec![frame.into_geometry()]
    }
}
