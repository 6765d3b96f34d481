use std::sync::Arc;

use tokio::sync::Mutex;

use crate::{
    application::{
        calendar::CalendarView, countdowns::CountdownBoard, sky::SkyService, task_service::TaskService,
        timer::TimerSession,
    },
    domain::{
        dates,
        repository::{LocalStorage, TaskRepository, TimeEntryRepository},
    },
};

/// Everything one dashboard session owns, shared by the HTTP handlers.
pub struct AppState<T: TaskRepository, E: TimeEntryRepository> {
    pub tasks: TaskService<T>,
    pub timer: TimerSession<E>,
    pub view: Arc<Mutex<CalendarView>>,
    pub countdowns: Arc<Mutex<CountdownBoard<Box<dyn LocalStorage>>>>,
    pub sky: SkyService,
}

impl<T: TaskRepository, E: TimeEntryRepository> AppState<T, E> {
    pub fn new(tasks: T, entries: E, storage: impl LocalStorage, sky: SkyService) -> Self {
        let storage: Box<dyn LocalStorage> = Box::new(storage);
        Self {
            tasks: TaskService::new(tasks),
            timer: TimerSession::new(entries),
            view: Arc::new(Mutex::new(CalendarView::new(dates::today()))),
            countdowns: Arc::new(Mutex::new(CountdownBoard::load(storage))),
            sky,
        }
    }
}

impl<T: TaskRepository, E: TimeEntryRepository> Clone for AppState<T, E> {
    fn clone(&self) -> Self {
        Self {
            tasks: self.tasks.clone(),
            timer: self.timer.clone(),
            view: self.view.clone(),
            countdowns: self.countdowns.clone(),
            sky: self.sky.clone(),
        }
    }
}
